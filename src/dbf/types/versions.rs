//! DBF version byte descriptions.

const VERSIONS: &[(u8, &str)] = &[
    (0x02, "FoxBASE"),
    (0x03, "FoxBASE+/Dbase III plus, no memory"),
    (0x30, "Visual FoxPro"),
    (0x31, "Visual FoxPro, autoincrement enabled"),
    (0x32, "Visual FoxPro with field type Varchar or Varbinary"),
    (0x43, "dBASE IV SQL table files, no memo"),
    (0x63, "dBASE IV SQL system files, no memo"),
    (0x83, "FoxBASE+/dBASE III PLUS, with memo"),
    (0x8B, "dBASE IV with memo"),
    (0xCB, "dBASE IV SQL table files, with memo"),
    (0xE5, "HiPer-Six format with SMT memo file"),
    (0xF5, "FoxPro 2.x (or earlier) with memo"),
    (0xFB, "FoxBASE"),
];

/// dBase III with memo; its memo file uses the 0x1A-terminated block format.
pub const DBASE3_WITH_MEMO: u8 = 0x83;

/// Returns a description of a DBF version byte, or `Unknown (0xNN)`.
pub fn version_name(version: u8) -> String {
    VERSIONS
        .iter()
        .find(|(code, _)| *code == version)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("Unknown (0x{:02x})", version))
}

/// True for the Visual FoxPro versions, where type `B` is a double.
pub fn is_visual_foxpro(version: u8) -> bool {
    matches!(version, 0x30..=0x32)
}
