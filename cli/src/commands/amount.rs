use typed_command_core::ParamType;

/// Mojos per XCH.
pub const MOJO_PER_XCH: u64 = 1_000_000_000_000;

const DECIMALS: usize = 12;

/// Converts a decimal XCH amount (`1.5`, `0.000000000001`) into mojos.
///
/// Parsing is exact: more than twelve decimal places, negative amounts and
/// amounts that overflow a `u64` are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmountParamType;

impl ParamType for AmountParamType {
    type Output = u64;

    fn name(&self) -> &'static str {
        "amount"
    }

    fn convert(&self, raw: &str) -> Result<u64, String> {
        let raw = raw.trim();
        let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction)
        {
            return Err(format!("'{raw}' is not a valid XCH amount."));
        }
        if fraction.len() > DECIMALS {
            return Err(format!(
                "'{raw}' has more than {DECIMALS} decimal places."
            ));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| format!("'{raw}' is too large."))?
        };
        let fraction: u64 = if fraction.is_empty() {
            0
        } else {
            format!("{fraction:0<DECIMALS$}")
                .parse()
                .map_err(|_| format!("'{raw}' is not a valid XCH amount."))?
        };

        whole
            .checked_mul(MOJO_PER_XCH)
            .and_then(|mojos| mojos.checked_add(fraction))
            .ok_or_else(|| format!("'{raw}' is too large."))
    }
}
