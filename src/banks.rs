//! Thai bank registry
//!
//! Maps the 3-digit institution codes used by the slip provider to the names
//! shown to customers and admins.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bank {
    pub code: &'static str,
    pub name: &'static str,
}

const BANKS: &[Bank] = &[
    Bank { code: "002", name: "ธนาคารกรุงเทพ (BBL)" },
    Bank { code: "004", name: "ธนาคารกสิกรไทย (KBANK)" },
    Bank { code: "006", name: "ธนาคารกรุงไทย (KTB)" },
    Bank { code: "011", name: "ธนาคารทหารไทยธนชาต (TTB)" },
    Bank { code: "014", name: "ธนาคารไทยพาณิชย์ (SCB)" },
    Bank { code: "022", name: "ธนาคารซีไอเอ็มบีไทย (CIMBT)" },
    Bank { code: "024", name: "ธนาคารยูโอบี (UOBT)" },
    Bank { code: "025", name: "ธนาคารกรุงศรีอยุธยา (BAY)" },
    Bank { code: "030", name: "ธนาคารออมสิน (GSB)" },
    Bank { code: "033", name: "ธนาคารอาคารสงเคราะห์ (GHB)" },
    Bank { code: "034", name: "ธนาคารเพื่อการเกษตรและสหกรณ์การเกษตร (BAAC)" },
    Bank { code: "035", name: "ธนาคารเพื่อการส่งออกและนำเข้าแห่งประเทศไทย (EXIM)" },
    Bank { code: "066", name: "ธนาคารอิสลามแห่งประเทศไทย (ISBT)" },
    Bank { code: "067", name: "ธนาคารทิสโก้ (TISCO)" },
    Bank { code: "069", name: "ธนาคารเกียรตินาคินภัทร (KKP)" },
    Bank { code: "070", name: "ธนาคารไอซีบีซี (ไทย) (ICBCT)" },
    Bank { code: "071", name: "ธนาคารไทยเครดิต (TCD)" },
    Bank { code: "073", name: "ธนาคารแลนด์ แอนด์ เฮ้าส์ (LHFG)" },
    Bank { code: "098", name: "ธนาคารพัฒนาวิสาหกิจขนาดกลางและขนาดย่อมแห่งประเทศไทย (SME)" },
];

/// Every registered bank, in display order
pub fn all() -> &'static [Bank] {
    BANKS
}

pub fn lookup(code: &str) -> Option<&'static Bank> {
    let code = code.trim();
    BANKS.iter().find(|bank| bank.code == code)
}

/// Display name for `code`, or `code` itself when the bank is not registered.
pub fn name_of(code: &str) -> &str {
    match lookup(code) {
        Some(bank) => bank.name,
        None => code,
    }
}
