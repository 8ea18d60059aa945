//! Text encodings used for character data, field names and text memos.

use std::borrow::Cow;

use encoding_rs::Encoding;
use oem_cp::code_table::{
    DECODING_TABLE_CP437, DECODING_TABLE_CP737, DECODING_TABLE_CP775, DECODING_TABLE_CP850,
    DECODING_TABLE_CP852, DECODING_TABLE_CP855, DECODING_TABLE_CP857, DECODING_TABLE_CP860,
    DECODING_TABLE_CP861, DECODING_TABLE_CP862, DECODING_TABLE_CP863, DECODING_TABLE_CP864,
    DECODING_TABLE_CP865, DECODING_TABLE_CP869,
};
use oem_cp::code_table_type::TableType;

use super::codepages;

/// DOS codepages `encoding_rs` has no decoder for: `(number, name, table)`.
static OEM_CODEPAGES: &[(u16, &str, &TableType)] = &[
    (437, "cp437", &TableType::Complete(&DECODING_TABLE_CP437)),
    (737, "cp737", &TableType::Complete(&DECODING_TABLE_CP737)),
    (775, "cp775", &TableType::Complete(&DECODING_TABLE_CP775)),
    (850, "cp850", &TableType::Complete(&DECODING_TABLE_CP850)),
    (852, "cp852", &TableType::Complete(&DECODING_TABLE_CP852)),
    (855, "cp855", &TableType::Complete(&DECODING_TABLE_CP855)),
    (857, "cp857", &TableType::Incomplete(&DECODING_TABLE_CP857)),
    (860, "cp860", &TableType::Complete(&DECODING_TABLE_CP860)),
    (861, "cp861", &TableType::Complete(&DECODING_TABLE_CP861)),
    (862, "cp862", &TableType::Complete(&DECODING_TABLE_CP862)),
    (863, "cp863", &TableType::Complete(&DECODING_TABLE_CP863)),
    (864, "cp864", &TableType::Incomplete(&DECODING_TABLE_CP864)),
    (865, "cp865", &TableType::Complete(&DECODING_TABLE_CP865)),
    (869, "cp869", &TableType::Complete(&DECODING_TABLE_CP869)),
];

fn oem_codepage(codepage: u16) -> Option<&'static (u16, &'static str, &'static TableType)> {
    OEM_CODEPAGES.iter().find(|(number, _, _)| *number == codepage)
}

/// How undecodable bytes in character data are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharDecodeErrors {
    /// Fail the field with a decode error.
    #[default]
    Strict,
    /// Substitute U+FFFD for every malformed sequence.
    Replace,
    /// Drop malformed sequences.
    Ignore,
}

/// The encoding of a table's character data.
///
/// `encoding_rs` implements the WHATWG encodings only, which has neither a
/// strict 7-bit ASCII codec nor the DOS codepages. DOS codepages are decoded
/// with the `oem_cp` tables; DBF files with language driver `0x00` (and
/// anything we cannot resolve) are read as plain ASCII.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Ascii,
    Codec(&'static Encoding),
    /// A DOS OEM codepage by number, e.g. `Oem(437)`.
    Oem(u16),
}

impl TextEncoding {
    /// Resolves an encoding label.
    ///
    /// Accepts `ascii`, DBF-style codepage names (`cp1252`, `cp936`, `mac_roman`, ...)
    /// and any WHATWG label known to `encoding_rs`.
    pub fn for_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "ascii" | "us-ascii" | "646" => Some(TextEncoding::Ascii),
            _ => codepages::encoding_for_name(&normalized)
                .or_else(|| Encoding::for_label(normalized.as_bytes()).map(TextEncoding::Codec)),
        }
    }

    /// Resolves a DOS codepage number, if there is a decoding table for it.
    pub fn oem(codepage: u16) -> Option<Self> {
        oem_codepage(codepage).map(|_| TextEncoding::Oem(codepage))
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Ascii => "ascii",
            TextEncoding::Codec(encoding) => encoding.name(),
            TextEncoding::Oem(codepage) => {
                oem_codepage(*codepage).map_or("oem", |(_, name, _)| *name)
            }
        }
    }

    /// Decodes `bytes`, returning `None` only under [`CharDecodeErrors::Strict`]
    /// when the input is malformed.
    pub fn decode(&self, bytes: &[u8], errors: CharDecodeErrors) -> Option<String> {
        match self {
            TextEncoding::Ascii => decode_ascii(bytes, errors),
            TextEncoding::Oem(codepage) => {
                let (_, _, table) = oem_codepage(*codepage)?;
                decode_oem(table, bytes, errors)
            }
            TextEncoding::Codec(encoding) => match errors {
                CharDecodeErrors::Strict => encoding
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .map(Cow::into_owned),
                CharDecodeErrors::Replace => {
                    let (text, _) = encoding.decode_without_bom_handling(bytes);
                    Some(text.into_owned())
                }
                CharDecodeErrors::Ignore => {
                    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
                    if had_errors {
                        Some(text.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER).collect())
                    } else {
                        Some(text.into_owned())
                    }
                }
            },
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn decode_ascii(bytes: &[u8], errors: CharDecodeErrors) -> Option<String> {
    if bytes.is_ascii() {
        return Some(bytes.iter().map(|&b| b as char).collect());
    }
    match errors {
        CharDecodeErrors::Strict => None,
        CharDecodeErrors::Replace => Some(
            bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        ),
        CharDecodeErrors::Ignore => Some(
            bytes
                .iter()
                .filter(|b| b.is_ascii())
                .map(|&b| b as char)
                .collect(),
        ),
    }
}

fn decode_oem(table: &TableType, bytes: &[u8], errors: CharDecodeErrors) -> Option<String> {
    match errors {
        CharDecodeErrors::Strict => table.decode_string_checked(bytes),
        CharDecodeErrors::Replace => Some(table.decode_string_lossy(bytes)),
        CharDecodeErrors::Ignore => Some(
            table
                .decode_string_lossy(bytes)
                .chars()
                .filter(|&c| c != char::REPLACEMENT_CHARACTER)
                .collect(),
        ),
    }
}
