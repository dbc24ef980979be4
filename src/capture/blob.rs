use super::recorder::Fragment;

/// An assembled deliverable: the concatenated recording plus its MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    /// MIME type appropriate to the capture mode
    pub content_type: String,
    /// Concatenated fragment bytes, in emission order
    pub data: Vec<u8>,
}

impl MediaBlob {
    /// A valid zero-length blob (recording stopped before any slice elapsed)
    pub fn empty(content_type: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            data: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Combine fragments, in emission order, into one deliverable blob
///
/// With `previous` present (a second recording segment within the same
/// session), the result is `previous` followed by the new fragments;
/// assembly is append-only across repeated stop events. Concatenation is
/// exact: no fragment is dropped, reordered, or duplicated, and the total
/// byte length is preserved.
pub fn assemble(
    fragments: Vec<Fragment>,
    previous: Option<MediaBlob>,
    content_type: &str,
) -> MediaBlob {
    let new_bytes: usize = fragments.iter().map(Fragment::len).sum();

    let mut data = previous.map(|blob| blob.data).unwrap_or_default();
    data.reserve(new_bytes);

    for fragment in fragments {
        data.extend_from_slice(&fragment.data);
    }

    MediaBlob {
        content_type: content_type.to_string(),
        data,
    }
}
