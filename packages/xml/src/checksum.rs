use crate::serializer::Serializer;
use crate::tree::Document;
use crc32fast::Hasher;

/// CRC32 of raw bytes, lowercase hex
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    format!("{:08x}", hasher.finalize())
}

/// Checksum of a document's canonical (compact) serialization
///
/// Equal trees have equal checksums regardless of the formatting of the
/// text they were parsed from.
pub fn document_checksum(doc: &Document) -> String {
    checksum(Serializer::compact().serialize(doc).as_bytes())
}
