use std::io;

/// Call sysconf(3) with the given argument.
///
/// A limit that is indeterminate is reported as an error,
/// just like a failed call.
pub fn sysconf(name: libc::c_int) -> io::Result<libc::c_long>
{
    // SAFETY: This is always safe.
    let result = unsafe { libc::sysconf(name) };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(result)
}

/// Equivalent to [`sysconf`] with `_SC_NPROCESSORS_ONLN`.
///
/// This is the number of processors currently online,
/// which may be less than the number of processors configured.
pub fn online_processors() -> io::Result<usize>
{
    let count = sysconf(libc::_SC_NPROCESSORS_ONLN)?;
    usize::try_from(count)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}
