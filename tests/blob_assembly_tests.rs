// Integration tests for fragment assembly
//
// These tests verify that fragments are concatenated byte-exactly, in
// emission order, and that repeated stop events append to the prior
// segment rather than replacing it.

use journal_capture::{assemble, Fragment, MediaBlob};

fn frag(index: u64, data: &[u8]) -> Fragment {
    Fragment::new(index, data.to_vec())
}

#[test]
fn test_assemble_concatenates_in_emission_order() {
    let fragments = vec![frag(0, b"alpha"), frag(1, b"beta"), frag(2, b"gamma")];

    let blob = assemble(fragments, None, "audio/webm");

    assert_eq!(blob.data, b"alphabetagamma");
    assert_eq!(blob.content_type, "audio/webm");
}

#[test]
fn test_assemble_preserves_total_byte_length() {
    let fragments = vec![
        frag(0, &[1u8; 17]),
        frag(1, &[2u8; 1]),
        frag(2, &[3u8; 0]),
        frag(3, &[4u8; 300]),
    ];
    let expected: usize = fragments.iter().map(|f| f.len()).sum();

    let blob = assemble(fragments, None, "audio/webm");

    assert_eq!(blob.len(), expected, "no fragment dropped or duplicated");
}

#[test]
fn test_reordering_fragments_changes_content_not_length() {
    let forward = assemble(
        vec![frag(0, b"abc"), frag(1, b"def")],
        None,
        "audio/webm",
    );
    let reversed = assemble(
        vec![frag(1, b"def"), frag(0, b"abc")],
        None,
        "audio/webm",
    );

    assert_eq!(forward.len(), reversed.len());
    assert_eq!(forward.data, b"abcdef");
    assert_eq!(reversed.data, b"defabc", "input order is output order, no silent reorder");
}

#[test]
fn test_assemble_appends_to_previous_segment() {
    let first = assemble(vec![frag(0, b"one-")], None, "audio/webm");
    let second = assemble(vec![frag(0, b"two")], Some(first.clone()), "audio/webm");

    assert_eq!(second.data, b"one-two", "previous segment comes first");
    assert_ne!(second.data, first.data, "result is never the previous segment alone");
    assert_ne!(second.data, b"two", "result is never the new fragments alone");
}

#[test]
fn test_assemble_empty_input_yields_valid_zero_length_blob() {
    let blob = assemble(Vec::new(), None, "video/webm");

    assert!(blob.is_empty());
    assert_eq!(blob.len(), 0);
    assert_eq!(blob.content_type, "video/webm");
}

#[test]
fn test_assemble_empty_input_keeps_previous_segment() {
    let previous = assemble(vec![frag(0, b"kept")], None, "audio/webm");

    let blob = assemble(Vec::new(), Some(previous), "audio/webm");

    assert_eq!(blob.data, b"kept");
}

#[test]
fn test_media_blob_empty_constructor() {
    let blob = MediaBlob::empty("audio/webm");

    assert!(blob.is_empty());
    assert_eq!(blob.content_type, "audio/webm");
}
