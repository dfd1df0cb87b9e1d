//! # Account Masking
//!
//! Card and account numbers enter the system as `AccountNumber`, which
//! only ever hands out masked forms. The masker turns one into a
//! `MaskedAccount`: a display string with the trailing digits kept and a
//! keyed HMAC-SHA256 fingerprint a backend can use to recognise the card.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize, Serializer};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Digits kept visible by default
pub const DEFAULT_VISIBLE_DIGITS: usize = 4;

/// Character used for hidden digits by default
pub const DEFAULT_MASK_CHAR: char = '*';

/// A sensitive account number.
///
/// There is no accessor for the digits: `Debug`, `Display` and
/// `Serialize` all render the masked form.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct AccountNumber {
    digits: String,
}

impl AccountNumber {
    /// Capture an account number, ignoring spaces and dashes.
    ///
    /// Accepts 4 to 19 digits.
    pub fn new(raw: &str) -> Result<Self, InvalidAccountNumber> {
        let digits: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();

        if digits.len() < 4 || digits.len() > 19 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidAccountNumber);
        }

        Ok(Self { digits })
    }

    /// Masked form with the default policy
    pub fn masked(&self) -> String {
        mask_digits(&self.digits, DEFAULT_VISIBLE_DIGITS, DEFAULT_MASK_CHAR)
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = InvalidAccountNumber;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        AccountNumber::new(&raw)
    }
}

impl std::fmt::Debug for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountNumber({})", self.masked())
    }
}

impl std::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.masked())
    }
}

impl Serialize for AccountNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.masked())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("account number must contain 4 to 19 digits")]
pub struct InvalidAccountNumber;

/// Hide all but the last `visible` digits, grouped in fours.
///
/// `mask_digits("4111111111111111", 4, '*')` is `"**** **** **** 1111"`.
pub fn mask_digits(digits: &str, visible: usize, mask_char: char) -> String {
    let len = digits.chars().count();
    let visible = visible.min(len);
    // Always hide something unless nothing can be hidden at all.
    let visible = if visible == len && len > 1 { len - 1 } else { visible };

    let mut out = String::with_capacity(len + len / 4);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 4 == 0 {
            out.push(' ');
        }
        if i < len - visible {
            out.push(mask_char);
        } else {
            out.push(c);
        }
    }
    out
}

/// A display-safe account representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedAccount {
    /// e.g. "**** **** **** 1111"
    pub display: String,
    /// The trailing digits kept for recognition
    pub last_digits: String,
    /// Hex HMAC-SHA256 of the full number under the session key
    pub fingerprint: String,
}

/// Applies the masking policy of one session
#[derive(Clone)]
pub struct AccountMasker {
    key: Vec<u8>,
    visible_digits: usize,
    mask_char: char,
}

impl AccountMasker {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
            visible_digits: DEFAULT_VISIBLE_DIGITS,
            mask_char: DEFAULT_MASK_CHAR,
        }
    }

    /// Builder: set how many trailing digits stay visible
    pub fn with_visible_digits(mut self, visible: usize) -> Self {
        self.visible_digits = visible;
        self
    }

    /// Builder: set the character used for hidden digits
    pub fn with_mask_char(mut self, mask_char: char) -> Self {
        self.mask_char = mask_char;
        self
    }

    pub fn mask(&self, account: &AccountNumber) -> MaskedAccount {
        let display = mask_digits(&account.digits, self.visible_digits, self.mask_char);
        let last_digits: String = display
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        MaskedAccount {
            display,
            last_digits,
            fingerprint: self.fingerprint(&account.digits),
        }
    }

    fn fingerprint(&self, digits: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(digits.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for AccountMasker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountMasker")
            .field("visible_digits", &self.visible_digits)
            .field("mask_char", &self.mask_char)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISA: &str = "4111111111111111";

    #[test]
    fn test_mask_digits_keeps_suffix() {
        assert_eq!(mask_digits(VISA, 4, '*'), "**** **** **** 1111");
        assert_eq!(mask_digits("378282246310005", 4, '•'), "••• •••• •••• 0005");
        assert_eq!(mask_digits("12345", 2, '*'), "* **45");
    }

    #[test]
    fn test_mask_digits_never_reveals_everything() {
        assert_eq!(mask_digits("1234", 4, '*'), "*234");
        assert_eq!(mask_digits("1234", 10, '*'), "*234");
    }

    #[test]
    fn test_account_number_normalises_input() {
        let account = AccountNumber::new("4111 1111-1111 1111").unwrap();
        assert_eq!(account.len(), 16);
        assert_eq!(account.masked(), "**** **** **** 1111");

        assert!(AccountNumber::new("123").is_err());
        assert!(AccountNumber::new("4111abcd11111111").is_err());
        assert!(AccountNumber::new("12345678901234567890").is_err());
    }

    #[test]
    fn test_account_number_never_prints_cleartext() {
        let account = AccountNumber::new(VISA).unwrap();

        assert!(!format!("{:?}", account).contains(VISA));
        assert!(!format!("{}", account).contains(VISA));
        assert!(!serde_json::to_string(&account).unwrap().contains(VISA));
    }

    #[test]
    fn test_masked_account_hides_full_number() {
        let masker = AccountMasker::new("session-key");
        let masked = masker.mask(&AccountNumber::new(VISA).unwrap());

        assert_eq!(masked.display, "**** **** **** 1111");
        assert_eq!(masked.last_digits, "1111");
        assert_eq!(masked.fingerprint.len(), 64);

        let digits_only: String = masked.display.chars().filter(char::is_ascii_digit).collect();
        assert_eq!(digits_only, "1111");
        assert!(!masked.fingerprint.contains(VISA));
    }

    #[test]
    fn test_fingerprint_depends_on_key() {
        let account = AccountNumber::new(VISA).unwrap();
        let a = AccountMasker::new("key-a").mask(&account);
        let b = AccountMasker::new("key-b").mask(&account);
        let a_again = AccountMasker::new("key-a").mask(&account);

        assert_ne!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint, a_again.fingerprint);
    }

    #[test]
    fn test_masker_policy_builders() {
        let masker = AccountMasker::new("k")
            .with_visible_digits(2)
            .with_mask_char('#');
        let masked = masker.mask(&AccountNumber::new("55554444").unwrap());

        assert_eq!(masked.display, "#### ##44");
        assert_eq!(masked.last_digits, "44");
    }

    #[test]
    fn test_deserialize_validates() {
        #[derive(Deserialize)]
        struct Holder {
            account: AccountNumber,
        }

        let holder: Holder = serde_json::from_str(r#"{"account": "4242 4242 4242 4242"}"#).unwrap();
        assert_eq!(holder.account.masked(), "**** **** **** 4242");

        assert!(serde_json::from_str::<Holder>(r#"{"account": "12"}"#).is_err());
    }
}
