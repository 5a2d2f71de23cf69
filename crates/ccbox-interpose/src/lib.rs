//! Syscall-interposition shim (spec §4.4): an `LD_PRELOAD`able library that
//! rewrites host-form path *arguments* to C library file primitives into
//! container form before forwarding to the real entry point.
//!
//! Deliberately does not translate any return value (no `container→host`
//! path ever leaves this layer) — see the module-level note on
//! `translate_input` for why, and DESIGN.md for the decision record.

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::sync::OnceLock;

/// Resolved `(host_prefix, container_prefix)`, both with any trailing
/// separator stripped. Initialized lazily on first intercepted call.
struct PrefixPair {
    host: String,
    container: String,
}

static PREFIX: OnceLock<Option<PrefixPair>> = OnceLock::new();

fn strip_trailing_sep(s: &str) -> &str {
    s.trim_end_matches(['/', '\\'])
}

/// Reads the host-form prefix from the process environment and the
/// container prefix from the real `getcwd` — lazily, once, per spec §4.4
/// step 2. Returns `None` if the environment variable isn't set, in which
/// case every wrapper becomes a transparent passthrough.
fn prefix_pair() -> &'static Option<PrefixPair> {
    PREFIX.get_or_init(|| {
        let host = std::env::var("CCBOX_WIN_ORIGINAL_PATH").ok()?;
        let mut buf = vec![0u8; libc::PATH_MAX as usize];
        let cwd = unsafe { real_getcwd(buf.as_mut_ptr().cast(), buf.len()) };
        if cwd.is_null() {
            return None;
        }
        let container = unsafe { CStr::from_ptr(cwd) }.to_string_lossy().into_owned();
        Some(PrefixPair {
            host: strip_trailing_sep(&host).to_string(),
            container: strip_trailing_sep(&container).to_string(),
        })
    })
}

/// Resolves and caches the real libc entry point for `name` via the
/// dynamic linker's next-symbol lookup (spec §4.4 step 1; §9 "interception
/// versus reimplementation").
macro_rules! real_fn {
    ($cache:ident, $name:literal, $ty:ty) => {{
        static CACHE: OnceLock<usize> = OnceLock::new();
        let addr = *CACHE.get_or_init(|| {
            let sym = CString::new($name).unwrap();
            let ptr = unsafe { libc::dlsym(libc::RTLD_NEXT, sym.as_ptr()) };
            ptr as usize
        });
        std::mem::transmute::<usize, $ty>(addr)
    }};
}

unsafe fn real_getcwd(buf: *mut c_char, size: usize) -> *mut c_char {
    type F = unsafe extern "C" fn(*mut c_char, usize) -> *mut c_char;
    let f: F = real_fn!(cache, "getcwd", F);
    f(buf, size)
}

/// Core translation rule (spec §4.4 step 3): if `path` begins with the host
/// prefix — case-insensitive on the first byte only, to tolerate drive
/// letter casing — followed by a separator or end-of-string, returns the
/// container-prefixed equivalent with `\` converted to `/`. Otherwise
/// returns `None` and the caller must pass the original pointer through
/// unmodified.
///
/// Output translation (container→host) is intentionally not performed
/// anywhere in this crate: a cached working-directory string that a runtime
/// later feeds back into an uninterposed syscall must remain valid on the
/// container's own filesystem, not silently reference the host's.
fn translate_input(path: &CStr, prefix: &PrefixPair) -> Option<CString> {
    let bytes = path.to_bytes();
    let host = prefix.host.as_bytes();
    if bytes.len() < host.len() {
        return None;
    }
    let (head, tail) = bytes.split_at(host.len());
    let first_byte_matches = match (head.first(), host.first()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    };
    if !first_byte_matches || !head[1..].eq_ignore_ascii_case(&host[1..]) {
        return None;
    }
    match tail.first() {
        None => {}
        Some(b'/') | Some(b'\\') => {}
        _ => return None,
    }

    let mut out = Vec::with_capacity(prefix.container.len() + tail.len());
    out.extend_from_slice(prefix.container.as_bytes());
    for &b in tail {
        out.push(if b == b'\\' { b'/' } else { b });
    }
    CString::new(out).ok()
}

/// Translates `path` in place if a host-prefix match succeeds, returning
/// either the translated `CString` (which the caller must keep alive for
/// the duration of the real call) or `None` when the argument is passed
/// through unmodified.
fn maybe_translate(path: *const c_char) -> Option<CString> {
    if path.is_null() {
        return None;
    }
    let prefix = prefix_pair().as_ref()?;
    let cstr = unsafe { CStr::from_ptr(path) };
    translate_input(cstr, prefix)
}

/// Picks the pointer to actually pass to the real call: the translated
/// buffer's pointer if translation happened, else the original.
fn effective_ptr<'a>(original: *const c_char, translated: &'a Option<CString>) -> *const c_char {
    translated.as_ref().map(|c| c.as_ptr()).unwrap_or(original)
}

macro_rules! real {
    ($name:literal, $ty:ty) => {{ real_fn!(cache, $name, $ty) }};
}

type PathIntFn = unsafe extern "C" fn(*const c_char) -> c_int;
type PathModeFn = unsafe extern "C" fn(*const c_char, libc::mode_t) -> c_int;
type PathOpenFn = unsafe extern "C" fn(*const c_char, c_int, libc::mode_t) -> c_int;
type PathOpenAtFn = unsafe extern "C" fn(c_int, *const c_char, c_int, libc::mode_t) -> c_int;
type PathStatFn = unsafe extern "C" fn(*const c_char, *mut libc::stat) -> c_int;
type PathStat64Fn = unsafe extern "C" fn(c_int, *const c_char, *mut libc::stat, c_int) -> c_int;
type TwoPathFn = unsafe extern "C" fn(*const c_char, *const c_char) -> c_int;
type FopenFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut libc::FILE;
type FreopenFn = unsafe extern "C" fn(*const c_char, *const c_char, *mut libc::FILE) -> *mut libc::FILE;
type ReadlinkFn = unsafe extern "C" fn(*const c_char, *mut c_char, usize) -> isize;
type ReadlinkAtFn = unsafe extern "C" fn(c_int, *const c_char, *mut c_char, usize) -> isize;
type OpendirFn = unsafe extern "C" fn(*const c_char) -> *mut libc::DIR;
type ChownFn = unsafe extern "C" fn(*const c_char, libc::uid_t, libc::gid_t) -> c_int;
type FchownatFn = unsafe extern "C" fn(c_int, *const c_char, libc::uid_t, libc::gid_t, c_int) -> c_int;
type FchmodatFn = unsafe extern "C" fn(c_int, *const c_char, libc::mode_t, c_int) -> c_int;
type FaccessatFn = unsafe extern "C" fn(c_int, *const c_char, c_int, c_int) -> c_int;
type MkdiratFn = unsafe extern "C" fn(c_int, *const c_char, libc::mode_t) -> c_int;
type UnlinkatFn = unsafe extern "C" fn(c_int, *const c_char, c_int) -> c_int;
type ExecveFn = unsafe extern "C" fn(*const c_char, *const *const c_char, *const *const c_char) -> c_int;

/// # Safety
/// Called only by the dynamic loader as a replacement for the real `open`.
#[no_mangle]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mode: libc::mode_t) -> c_int {
    let t = maybe_translate(path);
    let f: PathOpenFn = real!("open", PathOpenFn);
    f(effective_ptr(path, &t), flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn open64(path: *const c_char, flags: c_int, mode: libc::mode_t) -> c_int {
    let t = maybe_translate(path);
    let f: PathOpenFn = real!("open64", PathOpenFn);
    f(effective_ptr(path, &t), flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn creat(path: *const c_char, mode: libc::mode_t) -> c_int {
    let t = maybe_translate(path);
    let f: PathModeFn = real!("creat", PathModeFn);
    f(effective_ptr(path, &t), mode)
}

#[no_mangle]
pub unsafe extern "C" fn creat64(path: *const c_char, mode: libc::mode_t) -> c_int {
    let t = maybe_translate(path);
    let f: PathModeFn = real!("creat64", PathModeFn);
    f(effective_ptr(path, &t), mode)
}

#[no_mangle]
pub unsafe extern "C" fn openat(dirfd: c_int, path: *const c_char, flags: c_int, mode: libc::mode_t) -> c_int {
    let t = maybe_translate(path);
    let f: PathOpenAtFn = real!("openat", PathOpenAtFn);
    f(dirfd, effective_ptr(path, &t), flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn openat64(dirfd: c_int, path: *const c_char, flags: c_int, mode: libc::mode_t) -> c_int {
    let t = maybe_translate(path);
    let f: PathOpenAtFn = real!("openat64", PathOpenAtFn);
    f(dirfd, effective_ptr(path, &t), flags, mode)
}

#[no_mangle]
pub unsafe extern "C" fn fopen(path: *const c_char, mode: *const c_char) -> *mut libc::FILE {
    let t = maybe_translate(path);
    let f: FopenFn = real!("fopen", FopenFn);
    f(effective_ptr(path, &t), mode)
}

#[no_mangle]
pub unsafe extern "C" fn fopen64(path: *const c_char, mode: *const c_char) -> *mut libc::FILE {
    let t = maybe_translate(path);
    let f: FopenFn = real!("fopen64", FopenFn);
    f(effective_ptr(path, &t), mode)
}

#[no_mangle]
pub unsafe extern "C" fn freopen(path: *const c_char, mode: *const c_char, stream: *mut libc::FILE) -> *mut libc::FILE {
    let t = maybe_translate(path);
    let f: FreopenFn = real!("freopen", FreopenFn);
    f(effective_ptr(path, &t), mode, stream)
}

#[no_mangle]
pub unsafe extern "C" fn freopen64(path: *const c_char, mode: *const c_char, stream: *mut libc::FILE) -> *mut libc::FILE {
    let t = maybe_translate(path);
    let f: FreopenFn = real!("freopen64", FreopenFn);
    f(effective_ptr(path, &t), mode, stream)
}

#[no_mangle]
pub unsafe extern "C" fn stat(path: *const c_char, buf: *mut libc::stat) -> c_int {
    let t = maybe_translate(path);
    let f: PathStatFn = real!("stat", PathStatFn);
    f(effective_ptr(path, &t), buf)
}

#[no_mangle]
pub unsafe extern "C" fn lstat(path: *const c_char, buf: *mut libc::stat) -> c_int {
    let t = maybe_translate(path);
    let f: PathStatFn = real!("lstat", PathStatFn);
    f(effective_ptr(path, &t), buf)
}

/// The internal ABI-versioned stat wrappers glibc used before the modern
/// `stat`/`lstat` symbols stabilized; still emitted by some toolchains.
#[no_mangle]
pub unsafe extern "C" fn __xstat(ver: c_int, path: *const c_char, buf: *mut libc::stat) -> c_int {
    let t = maybe_translate(path);
    type F = unsafe extern "C" fn(c_int, *const c_char, *mut libc::stat) -> c_int;
    let f: F = real_fn!(cache, "__xstat", F);
    f(ver, effective_ptr(path, &t), buf)
}

#[no_mangle]
pub unsafe extern "C" fn __lxstat(ver: c_int, path: *const c_char, buf: *mut libc::stat) -> c_int {
    let t = maybe_translate(path);
    type F = unsafe extern "C" fn(c_int, *const c_char, *mut libc::stat) -> c_int;
    let f: F = real_fn!(cache, "__lxstat", F);
    f(ver, effective_ptr(path, &t), buf)
}

#[no_mangle]
pub unsafe extern "C" fn statx(
    dirfd: c_int,
    path: *const c_char,
    flags: c_int,
    mask: libc::c_uint,
    buf: *mut c_void,
) -> c_int {
    let t = maybe_translate(path);
    type F = unsafe extern "C" fn(c_int, *const c_char, c_int, libc::c_uint, *mut c_void) -> c_int;
    static CACHE: OnceLock<usize> = OnceLock::new();
    let addr = *CACHE.get_or_init(|| {
        let sym = CString::new("statx").unwrap();
        unsafe { libc::dlsym(libc::RTLD_NEXT, sym.as_ptr()) as usize }
    });
    if addr == 0 {
        *libc::__errno_location() = libc::ENOSYS;
        return -1;
    }
    let f: F = std::mem::transmute(addr);
    f(dirfd, effective_ptr(path, &t), flags, mask, buf)
}

#[no_mangle]
pub unsafe extern "C" fn access(path: *const c_char, mode: c_int) -> c_int {
    let t = maybe_translate(path);
    type F = unsafe extern "C" fn(*const c_char, c_int) -> c_int;
    let f: F = real_fn!(cache, "access", F);
    f(effective_ptr(path, &t), mode)
}

#[no_mangle]
pub unsafe extern "C" fn faccessat(dirfd: c_int, path: *const c_char, mode: c_int, flags: c_int) -> c_int {
    let t = maybe_translate(path);
    let f: FaccessatFn = real!("faccessat", FaccessatFn);
    f(dirfd, effective_ptr(path, &t), mode, flags)
}

#[no_mangle]
pub unsafe extern "C" fn chdir(path: *const c_char) -> c_int {
    let t = maybe_translate(path);
    let f: PathIntFn = real!("chdir", PathIntFn);
    f(effective_ptr(path, &t))
}

#[no_mangle]
pub unsafe extern "C" fn readlink(path: *const c_char, buf: *mut c_char, bufsiz: usize) -> isize {
    let t = maybe_translate(path);
    let f: ReadlinkFn = real!("readlink", ReadlinkFn);
    f(effective_ptr(path, &t), buf, bufsiz)
}

#[no_mangle]
pub unsafe extern "C" fn readlinkat(dirfd: c_int, path: *const c_char, buf: *mut c_char, bufsiz: usize) -> isize {
    let t = maybe_translate(path);
    let f: ReadlinkAtFn = real!("readlinkat", ReadlinkAtFn);
    f(dirfd, effective_ptr(path, &t), buf, bufsiz)
}

#[no_mangle]
pub unsafe extern "C" fn mkdir(path: *const c_char, mode: libc::mode_t) -> c_int {
    let t = maybe_translate(path);
    let f: PathModeFn = real!("mkdir", PathModeFn);
    f(effective_ptr(path, &t), mode)
}

#[no_mangle]
pub unsafe extern "C" fn mkdirat(dirfd: c_int, path: *const c_char, mode: libc::mode_t) -> c_int {
    let t = maybe_translate(path);
    let f: MkdiratFn = real!("mkdirat", MkdiratFn);
    f(dirfd, effective_ptr(path, &t), mode)
}

#[no_mangle]
pub unsafe extern "C" fn rmdir(path: *const c_char) -> c_int {
    let t = maybe_translate(path);
    let f: PathIntFn = real!("rmdir", PathIntFn);
    f(effective_ptr(path, &t))
}

#[no_mangle]
pub unsafe extern "C" fn unlink(path: *const c_char) -> c_int {
    let t = maybe_translate(path);
    let f: PathIntFn = real!("unlink", PathIntFn);
    f(effective_ptr(path, &t))
}

#[no_mangle]
pub unsafe extern "C" fn unlinkat(dirfd: c_int, path: *const c_char, flags: c_int) -> c_int {
    let t = maybe_translate(path);
    let f: UnlinkatFn = real!("unlinkat", UnlinkatFn);
    f(dirfd, effective_ptr(path, &t), flags)
}

/// Two-path calls translate both arguments independently (spec §4.4).
#[no_mangle]
pub unsafe extern "C" fn rename(old: *const c_char, new: *const c_char) -> c_int {
    let to = maybe_translate(old);
    let tn = maybe_translate(new);
    let f: TwoPathFn = real!("rename", TwoPathFn);
    f(effective_ptr(old, &to), effective_ptr(new, &tn))
}

#[no_mangle]
pub unsafe extern "C" fn renameat(
    olddirfd: c_int,
    old: *const c_char,
    newdirfd: c_int,
    new: *const c_char,
) -> c_int {
    let to = maybe_translate(old);
    let tn = maybe_translate(new);
    type F = unsafe extern "C" fn(c_int, *const c_char, c_int, *const c_char) -> c_int;
    let f: F = real_fn!(cache, "renameat", F);
    f(olddirfd, effective_ptr(old, &to), newdirfd, effective_ptr(new, &tn))
}

/// `renameat2` may be absent on older glibc; report ENOSYS rather than
/// dereferencing a null resolved symbol (spec §4.4, §7).
#[no_mangle]
pub unsafe extern "C" fn renameat2(
    olddirfd: c_int,
    old: *const c_char,
    newdirfd: c_int,
    new: *const c_char,
    flags: libc::c_uint,
) -> c_int {
    type F = unsafe extern "C" fn(c_int, *const c_char, c_int, *const c_char, libc::c_uint) -> c_int;
    static CACHE: OnceLock<usize> = OnceLock::new();
    let addr = *CACHE.get_or_init(|| {
        let sym = CString::new("renameat2").unwrap();
        unsafe { libc::dlsym(libc::RTLD_NEXT, sym.as_ptr()) as usize }
    });
    if addr == 0 {
        *libc::__errno_location() = libc::ENOSYS;
        return -1;
    }
    let to = maybe_translate(old);
    let tn = maybe_translate(new);
    let f: F = std::mem::transmute(addr);
    f(olddirfd, effective_ptr(old, &to), newdirfd, effective_ptr(new, &tn), flags)
}

#[no_mangle]
pub unsafe extern "C" fn symlink(target: *const c_char, linkpath: *const c_char) -> c_int {
    let tl = maybe_translate(linkpath);
    let f: TwoPathFn = real!("symlink", TwoPathFn);
    f(target, effective_ptr(linkpath, &tl))
}

#[no_mangle]
pub unsafe extern "C" fn symlinkat(target: *const c_char, newdirfd: c_int, linkpath: *const c_char) -> c_int {
    let tl = maybe_translate(linkpath);
    type F = unsafe extern "C" fn(*const c_char, c_int, *const c_char) -> c_int;
    let f: F = real_fn!(cache, "symlinkat", F);
    f(target, newdirfd, effective_ptr(linkpath, &tl))
}

#[no_mangle]
pub unsafe extern "C" fn link(old: *const c_char, new: *const c_char) -> c_int {
    let to = maybe_translate(old);
    let tn = maybe_translate(new);
    let f: TwoPathFn = real!("link", TwoPathFn);
    f(effective_ptr(old, &to), effective_ptr(new, &tn))
}

#[no_mangle]
pub unsafe extern "C" fn linkat(
    olddirfd: c_int,
    old: *const c_char,
    newdirfd: c_int,
    new: *const c_char,
    flags: c_int,
) -> c_int {
    let to = maybe_translate(old);
    let tn = maybe_translate(new);
    type F = unsafe extern "C" fn(c_int, *const c_char, c_int, *const c_char, c_int) -> c_int;
    let f: F = real_fn!(cache, "linkat", F);
    f(olddirfd, effective_ptr(old, &to), newdirfd, effective_ptr(new, &tn), flags)
}

#[no_mangle]
pub unsafe extern "C" fn chmod(path: *const c_char, mode: libc::mode_t) -> c_int {
    let t = maybe_translate(path);
    let f: PathModeFn = real!("chmod", PathModeFn);
    f(effective_ptr(path, &t), mode)
}

#[no_mangle]
pub unsafe extern "C" fn fchmodat(dirfd: c_int, path: *const c_char, mode: libc::mode_t, flags: c_int) -> c_int {
    let t = maybe_translate(path);
    let f: FchmodatFn = real!("fchmodat", FchmodatFn);
    f(dirfd, effective_ptr(path, &t), mode, flags)
}

#[no_mangle]
pub unsafe extern "C" fn chown(path: *const c_char, owner: libc::uid_t, group: libc::gid_t) -> c_int {
    let t = maybe_translate(path);
    let f: ChownFn = real!("chown", ChownFn);
    f(effective_ptr(path, &t), owner, group)
}

#[no_mangle]
pub unsafe extern "C" fn lchown(path: *const c_char, owner: libc::uid_t, group: libc::gid_t) -> c_int {
    let t = maybe_translate(path);
    let f: ChownFn = real!("lchown", ChownFn);
    f(effective_ptr(path, &t), owner, group)
}

#[no_mangle]
pub unsafe extern "C" fn fchownat(
    dirfd: c_int,
    path: *const c_char,
    owner: libc::uid_t,
    group: libc::gid_t,
    flags: c_int,
) -> c_int {
    let t = maybe_translate(path);
    let f: FchownatFn = real!("fchownat", FchownatFn);
    f(dirfd, effective_ptr(path, &t), owner, group, flags)
}

#[no_mangle]
pub unsafe extern "C" fn truncate(path: *const c_char, length: libc::off_t) -> c_int {
    let t = maybe_translate(path);
    type F = unsafe extern "C" fn(*const c_char, libc::off_t) -> c_int;
    let f: F = real_fn!(cache, "truncate", F);
    f(effective_ptr(path, &t), length)
}

#[no_mangle]
pub unsafe extern "C" fn utimes(path: *const c_char, times: *const libc::timeval) -> c_int {
    let t = maybe_translate(path);
    type F = unsafe extern "C" fn(*const c_char, *const libc::timeval) -> c_int;
    let f: F = real_fn!(cache, "utimes", F);
    f(effective_ptr(path, &t), times)
}

#[no_mangle]
pub unsafe extern "C" fn utimensat(
    dirfd: c_int,
    path: *const c_char,
    times: *const libc::timespec,
    flags: c_int,
) -> c_int {
    let t = maybe_translate(path);
    type F = unsafe extern "C" fn(c_int, *const c_char, *const libc::timespec, c_int) -> c_int;
    let f: F = real_fn!(cache, "utimensat", F);
    f(dirfd, effective_ptr(path, &t), times, flags)
}

#[no_mangle]
pub unsafe extern "C" fn realpath(path: *const c_char, resolved: *mut c_char) -> *mut c_char {
    let t = maybe_translate(path);
    type F = unsafe extern "C" fn(*const c_char, *mut c_char) -> *mut c_char;
    let f: F = real_fn!(cache, "realpath", F);
    f(effective_ptr(path, &t), resolved)
}

#[no_mangle]
pub unsafe extern "C" fn opendir(path: *const c_char) -> *mut libc::DIR {
    let t = maybe_translate(path);
    let f: OpendirFn = real!("opendir", OpendirFn);
    f(effective_ptr(path, &t))
}

#[no_mangle]
pub unsafe extern "C" fn execve(
    path: *const c_char,
    argv: *const *const c_char,
    envp: *const *const c_char,
) -> c_int {
    let t = maybe_translate(path);
    let f: ExecveFn = real!("execve", ExecveFn);
    f(effective_ptr(path, &t), argv, envp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix() -> PrefixPair {
        PrefixPair { host: "C:/Users/me/.claude".to_string(), container: "/ccbox/.claude".to_string() }
    }

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn translates_matching_prefix_with_slash_boundary() {
        let p = prefix();
        let input = c("C:/Users/me/.claude/projects/app/session.jsonl");
        let out = translate_input(&input, &p).unwrap();
        assert_eq!(out.to_str().unwrap(), "/ccbox/.claude/projects/app/session.jsonl");
    }

    #[test]
    fn translates_backslash_separators_to_forward_slashes() {
        let p = prefix();
        let input = c("C:/Users/me/.claude\\projects\\app");
        let out = translate_input(&input, &p).unwrap();
        assert_eq!(out.to_str().unwrap(), "/ccbox/.claude/projects/app");
    }

    #[test]
    fn prefix_match_is_case_insensitive_on_first_character_only() {
        let p = prefix();
        let lower = c("c:/Users/me/.claude/x");
        assert!(translate_input(&lower, &p).is_some());
        // Second character ('U' in "Users") must remain case-sensitive.
        let wrong_case = c("C:/users/me/.claude/x");
        assert!(translate_input(&wrong_case, &p).is_none());
    }

    #[test]
    fn exact_prefix_with_no_remainder_matches() {
        let p = prefix();
        let exact = c("C:/Users/me/.claude");
        let out = translate_input(&exact, &p).unwrap();
        assert_eq!(out.to_str().unwrap(), "/ccbox/.claude");
    }

    #[test]
    fn no_false_positive_on_longer_sibling_prefix() {
        let p = prefix();
        // "C:/Users/me/.claude2" must not match "C:/Users/me/.claude" as a prefix.
        let input = c("C:/Users/me/.claude2/x");
        assert!(translate_input(&input, &p).is_none());
    }

    #[test]
    fn unrelated_path_is_left_untranslated() {
        let p = prefix();
        let input = c("/etc/passwd");
        assert!(translate_input(&input, &p).is_none());
    }
}
