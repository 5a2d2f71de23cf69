//! Open-file handle encoding (spec §3): a single machine word where the
//! high bit carries the needs-transform flag and the remaining bits carry
//! the underlying backing descriptor.

/// `fuse3` hands back a `u64` file handle to the kernel; we round-trip the
/// real backing `RawFd` plus one bit of decision state through it instead of
/// keeping a side table, so a handle is self-describing on every
/// read/write/release without an extra lookup.
const TRANSFORM_FLAG: u64 = 1 << 63;
const FD_MASK: u64 = TRANSFORM_FLAG - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHandle {
    pub fd: std::os::fd::RawFd,
    pub transform: bool,
}

impl FileHandle {
    pub fn new(fd: std::os::fd::RawFd, transform: bool) -> Self {
        FileHandle { fd, transform }
    }

    pub fn encode(self) -> u64 {
        let fd = self.fd as u64 & FD_MASK;
        if self.transform {
            fd | TRANSFORM_FLAG
        } else {
            fd
        }
    }

    pub fn decode(word: u64) -> Self {
        FileHandle {
            fd: (word & FD_MASK) as std::os::fd::RawFd,
            transform: word & TRANSFORM_FLAG != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_transform_flag_set() {
        let h = FileHandle::new(42, true);
        assert_eq!(FileHandle::decode(h.encode()), h);
    }

    #[test]
    fn round_trips_without_transform_flag() {
        let h = FileHandle::new(7, false);
        let encoded = h.encode();
        assert_eq!(encoded & TRANSFORM_FLAG, 0);
        assert_eq!(FileHandle::decode(encoded), h);
    }
}
