use regex::Regex;

/// Look up `name` in a `document.cookie` style string.
///
/// The first `name=value` pair wins and its value is percent-decoded.
/// Missing cookies and values that do not decode to UTF-8 both give `None`.
pub fn get_cookie(cookies: &str, name: &str) -> Option<String> {
    let pattern = format!("(?:^|; ){}=([^;]*)", regex::escape(name));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            log::warn!("bad cookie pattern for {:?}: {}", name, e);
            return None;
        }
    };
    let raw = re.captures(cookies)?.get(1)?.as_str();
    match urlencoding::decode(raw) {
        Ok(value) => Some(value.into_owned()),
        Err(e) => {
            log::warn!("cookie {} is not valid utf-8: {}", name, e);
            None
        }
    }
}
