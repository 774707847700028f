//! Answers a request with a file, honoring conditional and range requests.

use std::time::{SystemTime, UNIX_EPOCH};

use http::header::{
    ACCEPT_RANGES, CONTENT_RANGE, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, RANGE,
};
use httpd_core::protocol::{FileBody, HandlerError, HttpError, RangeError, RangedSlice, Request, Response};
use mime::Mime;
use tracing::{debug, warn};

use crate::file::{FileResolver, ResolveError};

/// Fills `response` with the file `resolver` finds at `path`.
///
/// Sends `304 Not Modified` when the request's `If-Modified-Since` or `If-None-Match` shows
/// the client's copy is current, `206 Partial Content` for a satisfiable `Range` and the whole
/// file otherwise. Failures are raised as [`HttpError`]s: 404 for missing or unreadable files,
/// 403 for forbidden paths and 416 for unsatisfiable ranges.
pub async fn write_file_response<R>(
    request: &Request,
    mut response: Response,
    resolver: &R,
    path: &str,
) -> Result<Response, HandlerError>
where
    R: FileResolver + ?Sized,
{
    let file = match resolver.resolve(path).await {
        Ok(file) => file,
        Err(e @ ResolveError::Forbidden { .. }) => {
            debug!(cause = %e, "refusing file");
            return Err(HttpError::forbidden().into());
        }
        Err(e @ ResolveError::NotFound { .. }) => {
            debug!(cause = %e, "file not found");
            return Err(HttpError::not_found().into());
        }
        Err(e) => {
            warn!(cause = %e, path, "failed to open file");
            return Err(HttpError::not_found().into());
        }
    };

    response.set_header(CONTENT_TYPE, content_type(path).essence_str(), false)?;

    if let Ok(since) = request.get_header(IF_MODIFIED_SINCE)
        && !modified_since(file.modified, &since)
    {
        return not_modified(request, response);
    }
    response.set_header(LAST_MODIFIED, httpdate::fmt_http_date(file.modified), false)?;

    let etag = entity_tag(file.modified);
    if let Ok(candidates) = request.get_header(IF_NONE_MATCH)
        && etag_matches(&candidates, &etag)
    {
        return not_modified(request, response);
    }
    response.set_header(ETAG, &etag, false)?;

    let range = request.get_header(RANGE).ok();
    let slice = match RangedSlice::resolve(range.as_deref(), file.size) {
        Ok(slice) => slice,
        Err(RangeError::Unsatisfiable { size }) => {
            let error = HttpError::range_not_satisfiable()
                .with_hook(move |response| response.set_header(CONTENT_RANGE, format!("bytes */{size}"), false));
            return Err(error.into());
        }
    };

    if slice.is_ranged() {
        response.set_status_line(request.version(), 206, "Partial Content")?;
        response.set_header(CONTENT_RANGE, slice.content_range(), false)?;
    }
    response.set_header(ACCEPT_RANGES, "bytes", false)?;
    response.send_file(FileBody::new(file.source, slice))?;
    Ok(response)
}

/// Guesses the media type from the file extension.
pub fn content_type(path: &str) -> Mime {
    let extension = path.rsplit_once('.').map(|(_, extension)| extension.to_ascii_lowercase()).unwrap_or_default();
    let media_type = match extension.as_str() {
        "css" => return mime::TEXT_CSS,
        "gif" => return mime::IMAGE_GIF,
        "htm" | "html" => return mime::TEXT_HTML,
        "jpeg" | "jpg" => return mime::IMAGE_JPEG,
        "js" => return mime::TEXT_JAVASCRIPT,
        "png" => return mime::IMAGE_PNG,
        "txt" => return mime::TEXT_PLAIN,
        "bmp" => return mime::IMAGE_BMP,
        "3gp" => "video/3gpp",
        "3g2" => "video/3gpp2",
        "mp4" => "video/mp4",
        "ogg" | "ogv" => "video/ogg",
        "webm" => "video/webm",
        _ => return mime::APPLICATION_OCTET_STREAM,
    };
    media_type.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

fn not_modified(request: &Request, mut response: Response) -> Result<Response, HandlerError> {
    response.set_status_line(request.version(), 304, "Not Modified")?;
    response.set_header(CONTENT_TYPE, mime::TEXT_PLAIN.essence_str(), false)?;
    Ok(response)
}

/// Returns false when `since` is an HTTP date no older than `modified`, at second precision.
fn modified_since(modified: SystemTime, since: &str) -> bool {
    let Ok(since) = httpdate::parse_http_date(since) else {
        debug!(since, "ignoring malformed If-Modified-Since");
        return true;
    };
    unix_seconds(modified) > unix_seconds(since)
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|duration| duration.as_secs()).unwrap_or_default()
}

/// The modification time in milliseconds, quoted.
fn entity_tag(modified: SystemTime) -> String {
    let millis = modified.duration_since(UNIX_EPOCH).map(|duration| duration.as_millis()).unwrap_or_default();
    format!("\"{millis}\"")
}

fn etag_matches(candidates: &str, etag: &str) -> bool {
    let opaque = etag.trim_matches('"');
    candidates
        .split(',')
        .map(str::trim)
        .map(|candidate| candidate.strip_prefix("W/").unwrap_or(candidate))
        .any(|candidate| candidate == "*" || candidate == etag || candidate == opaque)
}
