//! OSC payload interpretation

use super::style::Hyperlink;

/// A recognized operating system command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OscCommand<'a> {
    /// OSC 0 / 1 / 2
    SetTitle(&'a str),
    /// OSC 8. `None` closes the active link.
    Hyperlink(Option<Hyperlink>),
    Unknown(&'a str),
}

/// Split a payload at its first `;` into selector and argument
pub fn split_selector(payload: &str) -> (&str, &str) {
    payload.split_once(';').unwrap_or((payload, ""))
}

pub fn parse(payload: &str) -> OscCommand<'_> {
    let (selector, rest) = split_selector(payload);
    match selector {
        "0" | "1" | "2" => OscCommand::SetTitle(rest),
        "8" => OscCommand::Hyperlink(parse_hyperlink(rest)),
        _ => OscCommand::Unknown(selector),
    }
}

/// Parse `params;url` where params is a `:`-separated list of `key=value`.
/// Only `id` is kept. An empty url closes the link.
pub fn parse_hyperlink(rest: &str) -> Option<Hyperlink> {
    let (params, url) = rest.split_once(';').unwrap_or(("", rest));
    if url.is_empty() {
        return None;
    }
    let id = params
        .split(':')
        .filter_map(|kv| kv.split_once('='))
        .find(|(k, _)| *k == "id")
        .map(|(_, v)| v.to_string())
        .unwrap_or_default();
    Some(Hyperlink {
        url: url.to_string(),
        id,
    })
}
