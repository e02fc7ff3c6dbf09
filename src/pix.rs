//! Synthetic PIX "copia e cola" codes.
//!
//! Codes follow the EMV merchant-presented layout (`ID` + two-digit length +
//! value) so they look right on screen, but the CRC field is random. No bank
//! will accept one, which is the point: payments in this crate are simulated.

use rand::distr::Alphanumeric;
use rand::Rng;

const PAYLOAD_FORMAT: &str = "01";
const PIX_GUI: &str = "BR.GOV.BCB.PIX";
const MERCHANT_CATEGORY: &str = "0000";
const CURRENCY_BRL: &str = "986";
const COUNTRY: &str = "BR";
const CITY: &str = "SAO PAULO";
const TXID_UNSPECIFIED: &str = "***";
const KEY_LEN: usize = 32;
const MERCHANT_NAME_MAX: usize = 25;

/// Generate a synthetic PIX code for `amount` payable to `merchant`.
///
/// # Example
///
/// ```
/// let code = delivery_kit::pix::generate(99.9, "Cantina da Nonna");
/// assert!(code.starts_with("000201"));
/// assert!(code.contains("BR.GOV.BCB.PIX"));
/// assert!(code.contains("540599.90"));
/// ```
pub fn generate(amount: f64, merchant: &str) -> String {
    let mut rng = rand::rng();

    let key: String = (&mut rng)
        .sample_iter(&Alphanumeric)
        .take(KEY_LEN)
        .map(char::from)
        .collect();
    let account = [field("00", PIX_GUI), field("01", &key)].concat();

    let mut code = String::with_capacity(160);
    code.push_str(&field("00", PAYLOAD_FORMAT));
    code.push_str(&field("26", &account));
    code.push_str(&field("52", MERCHANT_CATEGORY));
    code.push_str(&field("53", CURRENCY_BRL));
    code.push_str(&field("54", &format!("{:.2}", amount)));
    code.push_str(&field("58", COUNTRY));
    code.push_str(&field("59", &merchant_name(merchant)));
    code.push_str(&field("60", CITY));
    code.push_str(&field("62", &field("05", TXID_UNSPECIFIED)));

    let checksum: u16 = rng.random();
    code.push_str(&format!("6304{:04X}", checksum));
    code
}

/// One TLV field. Values longer than 99 bytes are cut to fit the length slot.
fn field(id: &str, value: &str) -> String {
    let value = truncate(value, 99);
    format!("{}{:02}{}", id, value.len(), value)
}

/// Uppercase ASCII merchant name, accents stripped to their base letter.
fn merchant_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter_map(|c| {
            let base = fold_accent(c);
            (base.is_ascii_alphanumeric() || base == ' ').then(|| base.to_ascii_uppercase())
        })
        .collect();

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "RESTAURANTE".to_string()
    } else {
        truncate(cleaned, MERCHANT_NAME_MAX).to_string()
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        other => other,
    }
}

/// Cut to at most `max` bytes on a char boundary.
fn truncate(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
