//! Case-insensitive KVP query parameters.

use percent_encoding::percent_decode_str;

use wcs_common::{WcsError, WcsResult};

/// Decoded query parameters with lowercased keys, in request order.
///
/// Keys may repeat (`subset` does), so lookups return the first value and
/// [`KvpParams::get_all`] returns every value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvpParams {
    entries: Vec<(String, String)>,
}

fn decode(raw: &str) -> WcsResult<String> {
    let plus_as_space = raw.replace('+', " ");
    percent_decode_str(&plus_as_space)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| WcsError::invalid("query", format!("'{}' is not valid UTF-8", raw)))
}

impl KvpParams {
    /// Parse a query string, with or without a leading `?`.
    pub fn parse(query: &str) -> WcsResult<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);

        let entries = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                Ok((decode(key)?.to_ascii_lowercase(), decode(value)?))
            })
            .collect::<WcsResult<Vec<_>>>()?;

        Ok(Self { entries })
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> + 'a {
        let key = key.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(move |(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
