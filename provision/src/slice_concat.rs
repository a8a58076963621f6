// Licensed under the Apache-2.0 license

use sidewalk_prov_error::ProvResult;

/// Copy `parts` back to back into `out`, returning the filled prefix.
///
/// Fails with `err` if `out` cannot hold every part.
pub(crate) fn concat_into<'a>(
    out: &'a mut [u8],
    parts: &[&[u8]],
    err: sidewalk_prov_error::ProvError,
) -> ProvResult<&'a [u8]> {
    let mut len = 0;
    for part in parts {
        let end = len + part.len();
        out.get_mut(len..end).ok_or(err)?.copy_from_slice(part);
        len = end;
    }
    Ok(&out[..len])
}
