//! Work lookup URLs.
//!
//! A work page is addressed as `/user/work/get/{work_id}`. The id usually
//! arrives in a query string (`?work_id=42`); when it is missing the literal
//! template placeholder is used so the page can be filled in server side.

use url::Url;

use crate::config::{Endpoints, WORK_PATH};
use crate::error::{ClientError, ValidationError};

pub const WORK_ID_PARAM: &str = "work_id";
pub const WORK_ID_PLACEHOLDER: &str = "{{WORK_ID}}";

/// Percent-decoded `work_id` from a query string. A leading `?` is accepted.
/// `+` is kept as is; only `%XX` escapes are decoded.
pub fn work_id_from_query(query: &str) -> Option<String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    query
        .split('&')
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            let key = urlencoding::decode(key).ok()?;
            (key == WORK_ID_PARAM).then_some(value)
        })
        .filter_map(|value| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
        .last()
}

pub fn resolve_work_id(query: &str) -> String {
    work_id_from_query(query)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| WORK_ID_PLACEHOLDER.to_string())
}

impl Endpoints {
    /// `{base}/user/work/get/{work_id}`, the id encoded as a single path segment.
    pub fn work(&self, work_id: &str) -> Result<Url, ClientError> {
        if work_id.is_empty() {
            return Err(ValidationError::MissingField(WORK_ID_PARAM).into());
        }
        let mut url = self
            .base()
            .join(WORK_PATH)
            .map_err(|e| ClientError::malformed(format!("invalid base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::malformed("base url cannot carry a path"))?
            .pop_if_empty()
            .push(work_id);
        Ok(url)
    }
}
