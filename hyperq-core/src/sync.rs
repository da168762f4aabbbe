//! Process-shared mutex and condition variables embedded in the header.
//!
//! Per the design note in spec §9: "a systems-language rewrite should wrap
//! the raw OS primitive in a type that enforces [the process-shared
//! attribute] at initialization and refuses copy/move after placement into
//! shared memory." `RawMutex`/`RawCondvar` are that wrapper: they are
//! `!Clone`, never constructed on the stack, and only ever reached through
//! a `&Header` that already lives inside the mapped segment.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

use crate::error::{HyperQError, Result};

#[cfg(target_os = "linux")]
const ROBUST_MUTEX: bool = true;
#[cfg(not(target_os = "linux"))]
const ROBUST_MUTEX: bool = false;

fn check(rc: i32, operation: &'static str) -> Result<()> {
    if rc == 0 {
        Ok(())
    } else {
        Err(HyperQError::Os {
            operation,
            source: std::io::Error::from_raw_os_error(rc),
        })
    }
}

/// A `pthread_mutex_t` that lives inside shared memory.
#[repr(C)]
pub struct RawMutex {
    inner: UnsafeCell<libc::pthread_mutex_t>,
}

// SAFETY: the mutex arbitrates access to the ring buffer across threads and
// processes by construction; this type is only ever reached through a
// shared reference into mapped memory.
unsafe impl Send for RawMutex {}
unsafe impl Sync for RawMutex {}

impl RawMutex {
    /// Initialize a freshly-zeroed mutex in place with the process-shared
    /// attribute (and, on Linux, the robust attribute).
    ///
    /// # Safety
    /// `ptr` must point to valid, writable memory for a `RawMutex` that no
    /// other thread is concurrently initializing or using.
    pub unsafe fn init_process_shared(ptr: *mut Self) -> Result<()> {
        let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
        check(
            libc::pthread_mutexattr_init(attr.as_mut_ptr()),
            "pthread_mutexattr_init",
        )?;
        let mut attr = attr.assume_init();
        let res = (|| {
            check(
                libc::pthread_mutexattr_setpshared(&mut attr, libc::PTHREAD_PROCESS_SHARED),
                "pthread_mutexattr_setpshared",
            )?;
            #[cfg(target_os = "linux")]
            {
                check(
                    libc::pthread_mutexattr_setrobust(&mut attr, libc::PTHREAD_MUTEX_ROBUST),
                    "pthread_mutexattr_setrobust",
                )?;
            }
            check(
                libc::pthread_mutex_init((*ptr).inner.get(), &attr),
                "pthread_mutex_init",
            )
        })();
        libc::pthread_mutexattr_destroy(&mut attr);
        res
    }

    fn raw(&self) -> *mut libc::pthread_mutex_t {
        self.inner.get()
    }

    /// Lock the mutex, blocking the calling thread until it is acquired.
    ///
    /// Returns `HyperQError::OwnerDied` if a robust mutex's previous owner
    /// died while holding the lock; the lock is still held in that case
    /// (made consistent via `pthread_mutex_consistent`), so callers that
    /// want to proceed anyway may ignore the error and use the guard that
    /// would otherwise have been returned — HyperQ instead treats this as
    /// fatal for the segment and propagates the error.
    pub fn lock(&self, segment_name: &str) -> Result<MutexGuard<'_>> {
        let rc = unsafe { libc::pthread_mutex_lock(self.raw()) };
        if rc == 0 {
            return Ok(MutexGuard { mutex: self });
        }
        if ROBUST_MUTEX && rc == libc::EOWNERDEAD {
            unsafe {
                libc::pthread_mutex_consistent(self.raw());
            }
            return Err(HyperQError::OwnerDied {
                name: segment_name.to_string(),
            });
        }
        Err(HyperQError::Os {
            operation: "pthread_mutex_lock",
            source: std::io::Error::from_raw_os_error(rc),
        })
    }

    /// Destroy the mutex. Only the last detaching handle may call this,
    /// and only after all other threads/processes have released it.
    ///
    /// # Safety
    /// No other thread may be holding or waiting on this mutex.
    pub unsafe fn destroy(&self) {
        libc::pthread_mutex_destroy(self.raw());
    }
}

/// RAII guard proving the segment mutex is held. Unlocks on drop.
pub struct MutexGuard<'a> {
    mutex: &'a RawMutex,
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_mutex_unlock(self.mutex.raw());
        }
    }
}

/// A `pthread_cond_t` that lives inside shared memory.
#[repr(C)]
pub struct RawCondvar {
    inner: UnsafeCell<libc::pthread_cond_t>,
}

unsafe impl Send for RawCondvar {}
unsafe impl Sync for RawCondvar {}

impl RawCondvar {
    /// Initialize a freshly-zeroed condition variable in place with the
    /// process-shared attribute.
    ///
    /// # Safety
    /// `ptr` must point to valid, writable memory for a `RawCondvar` that
    /// no other thread is concurrently initializing or using.
    pub unsafe fn init_process_shared(ptr: *mut Self) -> Result<()> {
        let mut attr = MaybeUninit::<libc::pthread_condattr_t>::uninit();
        check(
            libc::pthread_condattr_init(attr.as_mut_ptr()),
            "pthread_condattr_init",
        )?;
        let mut attr = attr.assume_init();
        let res = (|| {
            check(
                libc::pthread_condattr_setpshared(&mut attr, libc::PTHREAD_PROCESS_SHARED),
                "pthread_condattr_setpshared",
            )?;
            check(
                libc::pthread_cond_init((*ptr).inner.get(), &attr),
                "pthread_cond_init",
            )
        })();
        libc::pthread_condattr_destroy(&mut attr);
        res
    }

    fn raw(&self) -> *mut libc::pthread_cond_t {
        self.inner.get()
    }

    /// Atomically release `guard`'s mutex and block until signaled, then
    /// re-acquire it before returning. Mirrors `std::sync::Condvar::wait`.
    pub fn wait<'a>(&self, guard: MutexGuard<'a>) -> Result<MutexGuard<'a>> {
        let mutex = guard.mutex;
        // The guard's Drop must not run here: pthread_cond_wait takes
        // ownership of the "locked" state and hands it back atomically.
        std::mem::forget(guard);
        let rc = unsafe { libc::pthread_cond_wait(self.raw(), mutex.raw()) };
        if rc != 0 {
            return Err(HyperQError::Os {
                operation: "pthread_cond_wait",
                source: std::io::Error::from_raw_os_error(rc),
            });
        }
        Ok(MutexGuard { mutex })
    }

    /// Wake exactly one waiter.
    pub fn signal(&self) {
        unsafe {
            libc::pthread_cond_signal(self.raw());
        }
    }

    /// Wake all waiters (used by `clear()`, spec §4.5).
    pub fn broadcast(&self) {
        unsafe {
            libc::pthread_cond_broadcast(self.raw());
        }
    }

    /// Destroy the condition variable.
    ///
    /// # Safety
    /// No other thread may be waiting on this condition variable.
    pub unsafe fn destroy(&self) {
        libc::pthread_cond_destroy(self.raw());
    }
}
