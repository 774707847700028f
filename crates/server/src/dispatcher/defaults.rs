//! Built-in error pages, used for codes without a registered error handler.

use std::fmt::Write;

use httpd_core::protocol::{HttpVersion, Request, Response, ResponseError};

pub(crate) type BuiltinPage = fn(&Request, &mut Response) -> Result<(), ResponseError>;

pub(crate) fn builtin_page(code: u16) -> Option<BuiltinPage> {
    let page: BuiltinPage = match code {
        400 => bad_request,
        403 => forbidden,
        404 => not_found,
        413 => payload_too_large,
        416 => range_not_satisfiable,
        500 => internal_server_error,
        501 => not_implemented,
        505 => version_not_supported,
        _ => return None,
    };
    Some(page)
}

fn bad_request(_request: &Request, response: &mut Response) -> Result<(), ResponseError> {
    // nothing parsed from the request can be trusted here
    response.set_status_line(HttpVersion::HTTP_11, 400, "Bad Request")?;
    response.set_header("Content-Type", "text/plain", false)?;
    response.write("Bad request\n")
}

fn forbidden(request: &Request, response: &mut Response) -> Result<(), ResponseError> {
    html_page(request.version(), response, 403, "Forbidden", "")
}

fn not_found(request: &Request, response: &mut Response) -> Result<(), ResponseError> {
    let detail = format!(
        "<p><span style=\"font-family: monospace;\">{}</span> was not found.</p>",
        html_escape(request.path())
    );
    html_page(request.version(), response, 404, "Not Found", &detail)
}

fn payload_too_large(request: &Request, response: &mut Response) -> Result<(), ResponseError> {
    html_page(
        request.version(),
        response,
        413,
        "Request Entity Too Large",
        "<p>The request body is larger than this server accepts.</p>",
    )
}

fn range_not_satisfiable(request: &Request, response: &mut Response) -> Result<(), ResponseError> {
    html_page(
        request.version(),
        response,
        416,
        "Requested Range Not Satisfiable",
        "<p>The byte range was not valid for the requested resource.</p>",
    )
}

fn internal_server_error(request: &Request, response: &mut Response) -> Result<(), ResponseError> {
    html_page(
        request.version(),
        response,
        500,
        "Internal Server Error",
        "<p>Something's broken in this server and needs to be fixed.</p>",
    )
}

fn not_implemented(request: &Request, response: &mut Response) -> Result<(), ResponseError> {
    html_page(
        request.version(),
        response,
        501,
        "Not Implemented",
        "<p>This server does not implement the requested feature.</p>",
    )
}

fn version_not_supported(_request: &Request, response: &mut Response) -> Result<(), ResponseError> {
    html_page(
        HttpVersion::HTTP_11,
        response,
        505,
        "HTTP Version Not Supported",
        "<p>This server only supports HTTP/1.0 and HTTP/1.1 connections.</p>",
    )
}

fn html_page(
    version: HttpVersion,
    response: &mut Response,
    code: u16,
    reason: &str,
    detail: &str,
) -> Result<(), ResponseError> {
    response.set_status_line(version, code, reason)?;
    response.set_header("Content-Type", "text/html", false)?;
    response.write(format!(
        "<html><head><title>{code} {reason}</title></head><body><h1>{code} {reason}</h1>{detail}</body></html>"
    ))
}

/// Escapes every character as a numeric character reference.
fn html_escape(str: &str) -> String {
    str.chars().fold(String::with_capacity(str.len() * 6), |mut escaped, c| {
        // writing into a String never fails
        let _ = write!(escaped, "&#{};", u32::from(c));
        escaped
    })
}
