// Administrative code normalization
// Juso hands out a 10-digit admCd; the registry wants 5 + 5 digits and 4-digit lot numbers

use serde::{Deserialize, Serialize};

pub const SIGUNGU_LEN: usize = 5;
pub const BJDONG_LEN: usize = 5;
pub const ADM_CD_LEN: usize = SIGUNGU_LEN + BJDONG_LEN;
pub const LOT_LEN: usize = 4;

/// Lot classification (platGbCd)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlatGb {
    #[default]
    Plot,
    Mountain,
    Block,
}

impl PlatGb {
    pub const ALL: [PlatGb; 3] = [PlatGb::Plot, PlatGb::Mountain, PlatGb::Block];

    pub fn code(&self) -> &'static str {
        match self {
            PlatGb::Plot => "0",
            PlatGb::Mountain => "1",
            PlatGb::Block => "2",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(PlatGb::Plot),
            "1" => Some(PlatGb::Mountain),
            "2" => Some(PlatGb::Block),
            _ => None,
        }
    }

    /// Juso marks mountain lots with mtYn == "1"; everything else is a plain plot
    pub fn from_mt_yn(mt_yn: Option<&str>) -> Self {
        match mt_yn {
            Some("1") => PlatGb::Mountain,
            _ => PlatGb::Plot,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlatGb::Plot => "대지",
            PlatGb::Mountain => "산",
            PlatGb::Block => "블록",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            PlatGb::Plot => PlatGb::Mountain,
            PlatGb::Mountain => PlatGb::Block,
            PlatGb::Block => PlatGb::Plot,
        }
    }
}

/// Split a 10-digit admCd into (sigunguCd, bjdongCd).
/// Anything that is not exactly 10 characters yields None.
pub fn split_adm_cd(adm_cd: &str) -> Option<(String, String)> {
    let adm_cd = adm_cd.trim();
    if adm_cd.chars().count() != ADM_CD_LEN {
        return None;
    }
    let sigungu: String = adm_cd.chars().take(SIGUNGU_LEN).collect();
    let bjdong: String = adm_cd.chars().skip(SIGUNGU_LEN).collect();
    Some((sigungu, bjdong))
}

/// Left-pad with zeros; values already at or over width are returned as is
pub fn zero_pad(raw: &str, width: usize) -> String {
    format!("{:0>width$}", raw.trim(), width = width)
}

/// "12" -> "0012"; empty stays empty so optional lot numbers are not invented
pub fn pad_lot(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        String::new()
    } else {
        zero_pad(raw, LOT_LEN)
    }
}

pub fn normalize_sigungu(raw: &str) -> String {
    zero_pad(raw, SIGUNGU_LEN)
}

/// A full 10-digit code is accepted in the legal-dong field and cut down to its last 5
pub fn normalize_bjdong(raw: &str) -> String {
    match split_adm_cd(raw) {
        Some((_, bjdong)) => bjdong,
        None => zero_pad(raw, BJDONG_LEN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_adm_cd() {
        let (sigungu, bjdong) = split_adm_cd("1168010300").unwrap();
        assert_eq!(sigungu, "11680");
        assert_eq!(bjdong, "10300");
        assert_eq!(format!("{}{}", sigungu, bjdong), "1168010300");
    }

    #[test]
    fn test_split_adm_cd_rejects_wrong_length() {
        assert!(split_adm_cd("").is_none());
        assert!(split_adm_cd("116801030").is_none());
        assert!(split_adm_cd("11680103000").is_none());
    }

    #[test]
    fn test_split_reconcatenates_for_many_codes() {
        for code in ["1111010100", "4113510900", "2644010200", "5011025021"] {
            let (a, b) = split_adm_cd(code).unwrap();
            assert_eq!(a.len(), SIGUNGU_LEN);
            assert_eq!(b.len(), BJDONG_LEN);
            assert_eq!(a + &b, code);
        }
    }

    #[test]
    fn test_pad_lot() {
        assert_eq!(pad_lot("12"), "0012");
        assert_eq!(pad_lot("0"), "0000");
        assert_eq!(pad_lot(""), "");
        assert_eq!(pad_lot("  7 "), "0007");
    }

    #[test]
    fn test_pad_lot_is_idempotent() {
        for raw in ["1", "12", "123", "1234", "0012"] {
            let once = pad_lot(raw);
            assert_eq!(pad_lot(&once), once);
        }
        assert_eq!(pad_lot("1234"), "1234");
    }

    #[test]
    fn test_normalize_codes() {
        assert_eq!(normalize_sigungu("11680"), "11680");
        assert_eq!(normalize_sigungu("1168"), "01168");
        assert_eq!(normalize_bjdong("10300"), "10300");
        assert_eq!(normalize_bjdong("1168010300"), "10300");
        assert_eq!(normalize_bjdong("300"), "00300");
    }

    #[test]
    fn test_plat_gb_from_mt_yn() {
        assert_eq!(PlatGb::from_mt_yn(Some("1")), PlatGb::Mountain);
        assert_eq!(PlatGb::from_mt_yn(Some("0")), PlatGb::Plot);
        assert_eq!(PlatGb::from_mt_yn(None), PlatGb::Plot);
    }

    #[test]
    fn test_plat_gb_codes() {
        for gb in PlatGb::ALL {
            assert_eq!(PlatGb::from_code(gb.code()), Some(gb));
        }
        assert_eq!(PlatGb::from_code("9"), None);
        assert_eq!(PlatGb::Block.next(), PlatGb::Plot);
    }
}
