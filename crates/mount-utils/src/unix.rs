use crate::{MountError, Mounter, Result};
use duct::cmd;
use smallvec::SmallVec;
use std::{
  ffi::OsStr,
  fs, io,
  num::NonZeroUsize,
  os::unix::ffi::OsStrExt,
  path::{Path, PathBuf},
};
use tracing::{debug, error, info, warn};
use which::which;

const MOUNT_COMMAND: &str = "mount";
const UNMOUNT_COMMAND: &str = "umount";
const PROC_MOUNT_INFO_PATH: &str = "/proc/self/mountinfo";
const MAX_LIST_TRIES: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(3) };
const EXPECTED_AT_LEAST_FIELDS_PER_MOUNT_INFO: usize = 10;
const COMMON_MAX_FIELDS_PER_MOUNT_INFO: usize = 20;
const DELETED_SUFFIX: &[u8] = b" (deleted)";

/// Whether the process runs with an effective UID of 0.
pub fn is_root() -> bool {
  unsafe { libc::geteuid() == 0 }
}

pub(crate) fn process_umask(mask: u32) -> u32 {
  unsafe { libc::umask(mask as libc::mode_t) as u32 }
}

/// Attaches volumes with `mount --bind`.
#[derive(Debug, Clone)]
pub struct BindMounter {
  mount_path: PathBuf,
  unmount_path: PathBuf,
  mount_info_path: PathBuf,
}

impl BindMounter {
  /// Fails if `mount` or `umount` cannot be found on `PATH`.
  pub fn new() -> Result<Self> {
    let find = |name: &str| {
      which(name).map_err(|e| MountError::new(format!("Failed to find {}: {}", name, e)))
    };

    Ok(BindMounter {
      mount_path: find(MOUNT_COMMAND)?,
      unmount_path: find(UNMOUNT_COMMAND)?,
      mount_info_path: PathBuf::from(PROC_MOUNT_INFO_PATH),
    })
  }
}

impl Mounter for BindMounter {
  fn mount(&self, source: &Path, target: &Path) -> Result<()> {
    match fs::create_dir(target) {
      Ok(()) => debug!("Created mount point {}", target.display()),
      Err(e) if e.kind() == io::ErrorKind::AlreadyExists => (),
      Err(e) => return Err(e.into()),
    }

    info!("Bind mounting {} to {}", source.display(), target.display());
    run(
      &self.mount_path,
      &[OsStr::new("--bind"), source.as_os_str(), target.as_os_str()],
    )
  }

  fn unmount(&self, target: &Path) -> Result<()> {
    info!("Unmounting {}", target.display());
    run(&self.unmount_path, &[target.as_os_str()])
  }

  fn is_mounted(&self, target: &Path) -> Result<bool> {
    is_mounted_in(target, &self.mount_info_path)
  }

  fn umask(&self, mask: u32) -> u32 {
    process_umask(mask)
  }
}

fn run(program: &Path, args: &[&OsStr]) -> Result<()> {
  let cmdline = Some(program.as_os_str())
    .into_iter()
    .chain(args.iter().copied())
    .map(|a| a.to_string_lossy())
    .collect::<Vec<_>>()
    .join(" ");

  let output = cmd(program, args.iter().copied())
    .stderr_to_stdout()
    .stdout_capture()
    .unchecked()
    .run()
    .map_err(|e| MountError::CommandFailed(cmdline.clone(), e))?;

  if output.status.success() {
    return Ok(());
  }

  let out = String::from_utf8_lossy(&output.stdout);
  error!("Command {} failed with {}: {}", cmdline, output.status, out.trim());
  Err(MountError::CommandFailed(
    cmdline,
    io::Error::new(
      io::ErrorKind::Other,
      format!("{}: {}", output.status, out.trim()),
    ),
  ))
}

#[derive(Debug, PartialEq, Eq)]
enum MountPathInfo {
  Exists,
  NotExists,
  Corrupted,
}

fn mount_info(path: &Path) -> io::Result<MountPathInfo> {
  match path.metadata() {
    Ok(_) => Ok(MountPathInfo::Exists),
    Err(e) => match e.raw_os_error() {
      None => Err(e),
      Some(code) => match code {
        libc::ENOENT => Ok(MountPathInfo::NotExists),
        libc::ENOTCONN | libc::ESTALE | libc::EIO | libc::EACCES => Ok(MountPathInfo::Corrupted),
        _ => Err(e),
      },
    },
  }
}

fn is_mounted_in(target: &Path, mount_info_path: &Path) -> Result<bool> {
  match mount_info(target)? {
    MountPathInfo::Exists => (),
    MountPathInfo::NotExists => return Ok(false),
    MountPathInfo::Corrupted => {
      // A dead mount still has to be unmounted before anything can reuse the path.
      warn!("Found corrupted mount at {}", target.display());
      return Ok(true);
    }
  }

  let target = target.canonicalize()?;
  let mis = parse_mount_info(mount_info_path)?;

  // Later mounts shadow earlier ones.
  match mis
    .iter()
    .rev()
    .find(|mi| is_mount_point_match(&mi.mount_point, &target))
  {
    Some(mi) => {
      debug!(
        "{} is mount {} of {} ({}, root {})",
        target.display(),
        mi.id,
        mi.source,
        mi.fs_type,
        mi.root.display()
      );
      Ok(true)
    }
    None => Ok(false),
  }
}

fn is_mount_point_match(mount_point: &Path, dir: &Path) -> bool {
  let mount_point = mount_point.as_os_str().as_bytes();
  let dir = dir.as_os_str().as_bytes();
  match mount_point.strip_prefix(dir) {
    Some(rest) => rest.is_empty() || rest == DELETED_SUFFIX,
    None => false,
  }
}

/// ConsistentRead repeatedly reads a file until it gets the same content twice. This is useful when reading files
/// in /proc that are larger than page size and kernel may modify them between individual read() syscalls.
fn consistent_read(path: &Path, attempts: NonZeroUsize) -> io::Result<Vec<u8>> {
  let mut old_content = fs::read(path)?;

  for _ in 0..attempts.get() {
    let new_content = fs::read(path)?;
    if new_content == old_content {
      return Ok(new_content);
    }

    // Files are different, continue reading
    old_content = new_content;
  }

  Err(io::Error::new(
    io::ErrorKind::Other,
    format!(
      "could not get consistent content of '{}' after {} attempts",
      path.display(),
      attempts.get()
    ),
  ))
}

struct MountInfo {
  /// Unique ID for the mount (maybe reused after umount).
  id: isize,
  /// The pathname of the directory in the filesystem which forms the root of this mount.
  root: PathBuf,
  /// Mount source, filesystem-specific information. e.g. device, tmpfs name.
  source: String,
  /// Mount point, the pathname of the mount point.
  mount_point: PathBuf,
  /// The filesystem type in the form "type[.subtype]".
  fs_type: String,
}

fn parse_error(name: &'static str, value: &[u8], line: &[u8]) -> io::Error {
  io::Error::new(
    io::ErrorKind::Other,
    format!(
      "Failed to parse field {} from value '{}' in line: {}",
      name,
      String::from_utf8_lossy(value),
      String::from_utf8_lossy(line)
    ),
  )
}

/// Paths in mountinfo have space, tab, newline and backslash written as
/// `\ooo` octal escapes. Any other byte is written raw, so the result need
/// not be UTF-8.
fn unescape(field: &[u8]) -> PathBuf {
  let mut out = Vec::with_capacity(field.len());
  let mut i = 0;
  while i < field.len() {
    if field[i] == b'\\' && i + 3 < field.len() && is_octal_escape(&field[i + 1..i + 4]) {
      let value = (field[i + 1] - b'0') * 64 + (field[i + 2] - b'0') * 8 + (field[i + 3] - b'0');
      out.push(value);
      i += 4;
    } else {
      out.push(field[i]);
      i += 1;
    }
  }

  PathBuf::from(OsStr::from_bytes(&out))
}

fn is_octal_escape(digits: &[u8]) -> bool {
  digits.len() == 3 && digits[0] <= b'3' && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}

fn parse_mount_info(path: &Path) -> io::Result<Vec<MountInfo>> {
  let content = consistent_read(path, MAX_LIST_TRIES)?;

  let mut infos = Vec::new();
  for line in content.split(|b| *b == b'\n') {
    if line.is_empty() {
      continue;
    }

    // See `man proc` for authoritative description of format of the file.
    let fields = line
      .split(u8::is_ascii_whitespace)
      .filter(|f| !f.is_empty())
      .collect::<SmallVec<[&[u8]; COMMON_MAX_FIELDS_PER_MOUNT_INFO]>>();

    if fields.len() < EXPECTED_AT_LEAST_FIELDS_PER_MOUNT_INFO {
      return Err(io::Error::new(
        io::ErrorKind::Other,
        format!(
          "wrong number of fields in (expected at least {}, got {}): {}",
          EXPECTED_AT_LEAST_FIELDS_PER_MOUNT_INFO,
          fields.len(),
          String::from_utf8_lossy(line)
        ),
      ));
    }

    let id = std::str::from_utf8(fields[0])
      .ok()
      .and_then(|v| v.parse().ok())
      .ok_or_else(|| parse_error("id", fields[0], line))?;
    let root = unescape(fields[3]);
    let mount_point = unescape(fields[4]);

    // All fields until "-" are "optional fields".
    let mut iter = fields.into_iter().skip(6).skip_while(|f| *f != &b"-"[..]).skip(1);
    let fs_type = iter
      .next()
      .ok_or_else(|| parse_error("fs_type", b"", line))?;
    let source = iter
      .next()
      .ok_or_else(|| parse_error("source", b"", line))?;

    infos.push(MountInfo {
      id,
      root,
      source: String::from_utf8_lossy(source).into_owned(),
      mount_point,
      fs_type: String::from_utf8_lossy(fs_type).into_owned(),
    })
  }

  Ok(infos)
}
