// Resource request tokens and store responses.
//
// Token grammar:
//   <resource id>                                   current content
//   <resource id>_<old hash>_<new hash>.diff        delta between versions

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const DIFF_SUFFIX: &str = ".diff";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("empty resource token")]
    Empty,
    #[error("malformed delta token {0:?}: expected <id>_<old>_<new>.diff")]
    MalformedDelta(String),
    #[error("invalid character in resource token {0:?}")]
    InvalidCharacter(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceRequest {
    Content {
        resource_id: String,
    },
    Delta {
        resource_id: String,
        from: String,
        to: String,
    },
}

impl ResourceRequest {
    pub fn parse(token: &str) -> Result<Self, RequestError> {
        if token.is_empty() {
            return Err(RequestError::Empty);
        }
        let Some(body) = token.strip_suffix(DIFF_SUFFIX) else {
            check_part(token, token)?;
            return Ok(ResourceRequest::Content {
                resource_id: token.to_string(),
            });
        };

        let parts: Vec<&str> = body.split('_').collect();
        let [id, from, to] = parts.as_slice() else {
            return Err(RequestError::MalformedDelta(token.to_string()));
        };
        if id.is_empty() || from.is_empty() || to.is_empty() {
            return Err(RequestError::MalformedDelta(token.to_string()));
        }
        for part in [id, from, to] {
            check_part(part, token)?;
        }
        Ok(ResourceRequest::Delta {
            resource_id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    pub fn resource_id(&self) -> &str {
        match self {
            ResourceRequest::Content { resource_id } => resource_id,
            ResourceRequest::Delta { resource_id, .. } => resource_id,
        }
    }
}

// Parts end up in file names.
fn check_part(part: &str, token: &str) -> Result<(), RequestError> {
    if part
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        Ok(())
    } else {
        Err(RequestError::InvalidCharacter(token.to_string()))
    }
}

impl FromStr for ResourceRequest {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRequest::Content { resource_id } => f.write_str(resource_id),
            ResourceRequest::Delta {
                resource_id,
                from,
                to,
            } => write!(f, "{resource_id}_{from}_{to}{DIFF_SUFFIX}"),
        }
    }
}

/// What `get` hands back to the request layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Current stored bytes and their content hash.
    Content {
        resource_id: String,
        content: Vec<u8>,
        version: String,
    },
    /// A stored diff payload, or the full-content fallback payload when the
    /// requested delta does not exist.
    Delta { resource_id: String, payload: String },
}

impl Response {
    pub fn resource_id(&self) -> &str {
        match self {
            Response::Content { resource_id, .. } => resource_id,
            Response::Delta { resource_id, .. } => resource_id,
        }
    }

    /// Response body.
    pub fn body(&self) -> &[u8] {
        match self {
            Response::Content { content, .. } => content,
            Response::Delta { payload, .. } => payload.as_bytes(),
        }
    }
}
