//! Runtime support for programs instrumented by bbcount.
//!
//! The `count-bb` pass calls `setupAtExit` first thing in `main` and bumps
//! the common global `bbCounter` in every basic block. This crate defines
//! the hook: it registers an exit handler that prints the final count.
//!
//! # Usage
//!
//! ```bash
//! bbcount hello.ll -o hello.bb.ll
//! cargo build --release --manifest-path crates/bbcount-rt/Cargo.toml
//! clang hello.bb.ll crates/bbcount-rt/target/release/libbbcount_rt.a -o hello
//! ./hello   # prints "bbCounter: <n>" on stderr at exit
//! ```

use std::io::Write;
use std::ptr;
use std::sync::Once;

unsafe extern "C" {
    /// Defined by the instrumented module.
    #[link_name = "bbCounter"]
    static BB_COUNTER: u64;

    fn atexit(callback: extern "C" fn()) -> i32;
}

static REGISTER: Once = Once::new();

/// Register the exit-time counter dump. Safe to call more than once.
#[unsafe(no_mangle)]
#[allow(non_snake_case)]
pub extern "C" fn setupAtExit() {
    REGISTER.call_once(|| {
        // SAFETY: `dump_counter` is a plain `extern "C" fn` with no captures.
        if unsafe { atexit(dump_counter) } != 0 {
            writeln!(std::io::stderr(), "bbcount-rt: failed to register exit handler").ok();
        }
    });
}

extern "C" fn dump_counter() {
    // SAFETY: the instrumented module defines `bbCounter` as an i64 that
    // only its own code writes; by exit time those writes are done.
    let count = unsafe { ptr::read_volatile(&raw const BB_COUNTER) };
    writeln!(std::io::stderr(), "bbCounter: {count}").ok();
}
