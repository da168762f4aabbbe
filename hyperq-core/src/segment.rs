//! Named POSIX shared-memory segment with the double virtual mapping
//! (spec §4.1). `Segment` owns the mapping; it knows nothing about the
//! ring buffer protocol layered on top in `ring.rs`.

use std::ffi::CString;

use tracing::{debug, info};

use crate::error::{HyperQError, Result};
use crate::header::Header;
use crate::name::SegmentName;

fn page_size() -> usize {
    // SAFETY: sysconf with _SC_PAGESIZE has no preconditions.
    let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if sz <= 0 {
        4096
    } else {
        sz as usize
    }
}

fn round_up_to_page(value: u64, page_size: usize) -> u64 {
    let page_size = page_size as u64;
    ((value + page_size - 1) / page_size) * page_size
}

/// Whether this process created the segment or attached to one that
/// already existed. Used only for logging/diagnostics (spec §9: the
/// refcount, not this flag, decides who unlinks on teardown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Creator,
    Attacher,
}

/// An attached named shared-memory segment: the header region followed by
/// two virtual mappings of the same physical capacity-sized backing pages.
pub struct Segment {
    name: SegmentName,
    base: *mut u8,
    total_len: usize,
    header_len: usize,
    capacity: u64,
    provenance: Provenance,
}

// SAFETY: the mapped region is shared and process-shared-synchronized by
// the embedded mutex/cvars; `Segment` itself holds no thread-local state.
unsafe impl Send for Segment {}
unsafe impl Sync for Segment {}

impl Segment {
    /// Create a new segment, or attach to one that already exists under
    /// the same name (spec §6: "if a name already exists, the new handle
    /// attaches rather than erroring").
    pub fn open(name: SegmentName, requested_capacity: u64) -> Result<Self> {
        let page = page_size();
        let c_name = CString::new(name.as_kernel_name()).map_err(|_| {
            HyperQError::InvalidArgument("segment name must not contain NUL bytes".into())
        })?;

        // SAFETY: c_name is a valid NUL-terminated C string.
        let create_fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o600,
            )
        };

        let (fd, provenance, capacity) = if create_fd >= 0 {
            if requested_capacity == 0 {
                unsafe {
                    libc::close(create_fd);
                    libc::shm_unlink(c_name.as_ptr());
                }
                return Err(HyperQError::InvalidArgument(
                    "capacity must be greater than zero".into(),
                ));
            }
            (create_fd, Provenance::Creator, round_up_to_page(requested_capacity, page))
        } else {
            let errno = std::io::Error::last_os_error()
                .raw_os_error()
                .unwrap_or(0);
            if errno != libc::EEXIST {
                return Err(HyperQError::os("shm_open"));
            }
            // SAFETY: c_name is valid; opening an existing object for attach.
            let attach_fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
            if attach_fd < 0 {
                return Err(HyperQError::os("shm_open"));
            }
            // Capacity is read from the existing header once mapped, below.
            (attach_fd, Provenance::Attacher, 0)
        };

        let header_len = Header::region_len(page);

        let result = (|| -> Result<Self> {
            if provenance == Provenance::Creator {
                let total = header_len as u64 + capacity;
                // SAFETY: fd is a valid, just-created shm fd.
                if unsafe { libc::ftruncate(fd, total as libc::off_t) } != 0 {
                    return Err(HyperQError::os("ftruncate"));
                }
            }

            // For an attacher we don't yet know the real capacity; map the
            // header first to read it, then remap the buffer region sized
            // correctly. To keep the common path simple we instead read
            // the capacity via a small header-only probe mapping.
            let capacity = if provenance == Provenance::Attacher {
                probe_capacity(fd, header_len, name.display_name())?
            } else {
                capacity
            };

            let total_len = header_len + 2 * capacity as usize;

            // Reserve a contiguous virtual range (step 4, spec §4.1).
            // SAFETY: anonymous, no-access placeholder mapping.
            let reservation = unsafe {
                libc::mmap(
                    std::ptr::null_mut(),
                    total_len,
                    libc::PROT_NONE,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                    -1,
                    0,
                )
            };
            if reservation == libc::MAP_FAILED {
                return Err(HyperQError::os("mmap (reservation)"));
            }
            let base = reservation as *mut u8;

            // Map header + canonical capacity region at offset 0 (step 5/6).
            // SAFETY: base was just reserved with this exact length; fd is
            // a valid shared-memory object sized appropriately.
            let primary = unsafe {
                libc::mmap(
                    base as *mut libc::c_void,
                    header_len + capacity as usize,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED | libc::MAP_FIXED,
                    fd,
                    0,
                )
            };
            if primary == libc::MAP_FAILED {
                unsafe {
                    libc::munmap(base as *mut libc::c_void, total_len);
                }
                return Err(HyperQError::os("mmap (header+buffer)"));
            }

            // Map the capacity region a second time, aliasing the same
            // physical pages, immediately after the first (step 6): this
            // is the double-mapping trick that makes wrap-around writes a
            // single contiguous `memcpy`.
            // SAFETY: the target range was reserved above and is free for
            // MAP_FIXED to replace; fd/offset address the same backing
            // pages as the primary buffer mapping.
            let alias = unsafe {
                libc::mmap(
                    base.add(header_len + capacity as usize) as *mut libc::c_void,
                    capacity as usize,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_SHARED | libc::MAP_FIXED,
                    fd,
                    header_len as libc::off_t,
                )
            };
            if alias == libc::MAP_FAILED {
                unsafe {
                    libc::munmap(base as *mut libc::c_void, total_len);
                }
                return Err(HyperQError::os("mmap (alias)"));
            }

            let header_ptr = base as *mut Header;
            match provenance {
                Provenance::Creator => unsafe {
                    Header::init_fresh(header_ptr, capacity)?;
                },
                Provenance::Attacher => unsafe {
                    Header::attach(header_ptr, name.as_kernel_name())?;
                },
            }

            Ok(Segment {
                name: name.clone(),
                base,
                total_len,
                header_len,
                capacity,
                provenance,
            })
        })();

        // SAFETY: fd is always valid here regardless of branch taken.
        unsafe {
            libc::close(fd);
        }

        match result {
            Ok(segment) => {
                match segment.provenance {
                    Provenance::Creator => info!(
                        name = name_for_log(&segment.name),
                        capacity = segment.capacity,
                        "created shared-memory segment"
                    ),
                    Provenance::Attacher => info!(
                        name = name_for_log(&segment.name),
                        capacity = segment.capacity,
                        "attached to existing shared-memory segment"
                    ),
                }
                Ok(segment)
            }
            Err(err) => {
                if provenance == Provenance::Creator {
                    // spec §7: "os-error during construction leaves no
                    // partially-initialized segment (the creator unlinks
                    // on failure)."
                    unsafe {
                        libc::shm_unlink(c_name.as_ptr());
                    }
                }
                Err(err)
            }
        }
    }

    pub fn name(&self) -> &SegmentName {
        &self.name
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn header(&self) -> &Header {
        // SAFETY: the header mapping is valid for the lifetime of `self`.
        unsafe { &*(self.base as *const Header) }
    }

    /// Pointer to the start of the canonical (first) capacity-sized
    /// buffer region. Valid offsets for a contiguous read/write of up to
    /// `capacity` bytes are `0..capacity` even when the logical window
    /// wraps, because the next `capacity` bytes alias the same pages.
    pub fn data_ptr(&self) -> *mut u8 {
        unsafe { self.base.add(self.header_len) }
    }

    /// Decrement the refcount; if this call observes the transition to
    /// zero, tear the segment down (destroy sync primitives, unmap,
    /// unlink). Otherwise just unmap.
    fn detach(&mut self) {
        let is_last = self.header().release();
        if is_last {
            debug!(
                name = name_for_log(&self.name),
                "last handle detaching; tearing down segment"
            );
            // SAFETY: refcount just observed 0, so no other handle holds
            // or is waiting on the mutex/cvars.
            unsafe {
                self.header().destroy_sync();
            }
        }
        // SAFETY: base/total_len describe exactly the mappings this
        // Segment established in `open`.
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.total_len);
        }
        if is_last {
            if let Ok(c_name) = CString::new(self.name.as_kernel_name()) {
                // SAFETY: c_name is a valid NUL-terminated C string.
                unsafe {
                    libc::shm_unlink(c_name.as_ptr());
                }
            }
            info!(name = name_for_log(&self.name), "unlinked shared-memory segment");
        }
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        self.detach();
    }
}

fn name_for_log(name: &SegmentName) -> &str {
    name.display_name()
}

/// Map just the header region to read `capacity` out of an existing
/// segment before establishing the full double mapping at the right size.
fn probe_capacity(fd: libc::c_int, header_len: usize, segment_name: &str) -> Result<u64> {
    // SAFETY: fd is a valid, open shared-memory descriptor for an
    // already-sized object (it pre-existed, so ftruncate already ran).
    let probe = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            header_len,
            libc::PROT_READ,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };
    if probe == libc::MAP_FAILED {
        return Err(HyperQError::os("mmap (capacity probe)"));
    }
    let header_ptr = probe as *const Header;
    // Spin-wait for magic here too, since the creator may not have
    // finished initializing yet.
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(200);
    let capacity = loop {
        // SAFETY: header_ptr is valid for header_len bytes.
        let magic = unsafe {
            (*(header_ptr as *const std::sync::atomic::AtomicU32))
                .load(std::sync::atomic::Ordering::Acquire)
        };
        if magic == crate::header::MAGIC {
            break unsafe { (*header_ptr).capacity() };
        }
        if std::time::Instant::now() >= deadline {
            unsafe {
                libc::munmap(probe, header_len);
            }
            return Err(HyperQError::NotInitialized {
                name: segment_name.to_string(),
            });
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    };
    unsafe {
        libc::munmap(probe, header_len);
    }
    Ok(capacity)
}
