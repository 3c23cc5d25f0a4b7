//! Typed boundary between user text and the dialogs.
//!
//! Every dialog step parses its input through these functions and gets a
//! [`ParseError`] back instead of a panic or a raw engine error.

use engine::{CurrencyCode, Money};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum ParseError {
    #[error("Please enter a valid amount, like 12.50.")]
    InvalidAmount,
    #[error("The amount must be greater than zero.")]
    NotPositive,
    #[error("Amounts can have at most two decimals.")]
    TooManyDecimals,
    #[error("Please enter at least one name.")]
    Empty,
    #[error("Expected {expected} amounts, got {got}.")]
    SplitCount { expected: usize, got: usize },
    #[error("The amounts add up to {got}, but the expense is {expected}.")]
    SplitSum { expected: Money, got: Money },
    #[error("{0} is not a valid currency code.")]
    InvalidCurrency(String),
}

/// Answer of a confirmation prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Confirmation {
    Yes,
    No,
}

/// Parses a strictly positive amount with at most two decimals.
pub(crate) fn parse_amount(input: &str) -> Result<Money, ParseError> {
    let amount = parse_money(input)?;
    if !amount.is_positive() {
        return Err(ParseError::NotPositive);
    }
    Ok(amount)
}

fn parse_money(input: &str) -> Result<Money, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::InvalidAmount);
    }
    trimmed.parse::<Money>().map_err(|_| {
        let decimals = trimmed.split_once('.').map_or(0, |(_, frac)| frac.len());
        let digits_only = trimmed
            .trim_start_matches(['+', '-'])
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.');
        if decimals > 2 && digits_only {
            ParseError::TooManyDecimals
        } else {
            ParseError::InvalidAmount
        }
    })
}

/// `true` if the input is the keyword `all`, ignoring case.
pub(crate) fn is_all(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("all")
}

/// `true` if the input is the keyword `equal`, ignoring case.
pub(crate) fn is_equal(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("equal")
}

/// Only `yes` (any case) confirms; everything else cancels.
pub(crate) fn parse_confirmation(input: &str) -> Confirmation {
    match input.trim().to_ascii_lowercase().as_str() {
        "yes" => Confirmation::Yes,
        _ => Confirmation::No,
    }
}

/// Splits a comma separated list of names, trimming each one and dropping
/// empty entries. Order is kept, duplicates are removed.
pub(crate) fn parse_names(input: &str) -> Result<Vec<String>, ParseError> {
    let mut names: Vec<String> = Vec::new();
    for name in input.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    if names.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(names)
}

/// Parses one amount per beneficiary.
///
/// The count must match `beneficiaries` and the amounts must add up exactly
/// to `total`. Zero shares are allowed, negative ones are not.
pub(crate) fn parse_split(
    input: &str,
    beneficiaries: usize,
    total: Money,
) -> Result<Vec<Money>, ParseError> {
    let parts: Vec<&str> = input.split(',').collect();
    if parts.len() != beneficiaries {
        return Err(ParseError::SplitCount {
            expected: beneficiaries,
            got: parts.len(),
        });
    }
    let amounts = parts
        .into_iter()
        .map(|part| {
            let amount = parse_money(part)?;
            if amount.is_negative() {
                return Err(ParseError::InvalidAmount);
            }
            Ok(amount)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let sum: Money = amounts.iter().sum();
    if sum != total {
        return Err(ParseError::SplitSum {
            expected: total,
            got: sum,
        });
    }
    Ok(amounts)
}

pub(crate) fn parse_currency(input: &str) -> Result<CurrencyCode, ParseError> {
    input
        .parse()
        .map_err(|_| ParseError::InvalidCurrency(input.trim().to_string()))
}

/// Splits `/name@bot args` into `("name", "args")`. `None` if the text is not
/// a command.
pub fn split_command(text: &str) -> Option<(String, String)> {
    let rest = text.trim().strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or_default();
    if name.is_empty() {
        return None;
    }
    Some((name.to_ascii_lowercase(), args.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_positive_with_two_decimals() {
        assert_eq!(parse_amount("30").unwrap(), Money::new(30_00));
        assert_eq!(parse_amount(" 12.5 ").unwrap(), Money::new(12_50));
        assert_eq!(parse_amount("0"), Err(ParseError::NotPositive));
        assert_eq!(parse_amount("-4"), Err(ParseError::NotPositive));
        assert_eq!(parse_amount("1.234"), Err(ParseError::TooManyDecimals));
        assert_eq!(parse_amount("ten"), Err(ParseError::InvalidAmount));
        assert_eq!(parse_amount(""), Err(ParseError::InvalidAmount));
    }

    #[test]
    fn names_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_names(" alice, bob ,,alice ").unwrap(),
            vec!["alice".to_string(), "bob".to_string()]
        );
        assert_eq!(parse_names(" , "), Err(ParseError::Empty));
    }

    #[test]
    fn split_needs_matching_count_and_exact_sum() {
        let total = Money::new(20_00);
        assert_eq!(
            parse_split("5,5,5", 3, total),
            Err(ParseError::SplitSum {
                expected: total,
                got: Money::new(15_00)
            })
        );
        assert_eq!(
            parse_split("10,10", 3, total),
            Err(ParseError::SplitCount {
                expected: 3,
                got: 2
            })
        );
        assert_eq!(
            parse_split("12.50, 7.5", 2, total).unwrap(),
            vec![Money::new(12_50), Money::new(7_50)]
        );
        assert_eq!(parse_split("25,-5", 2, total), Err(ParseError::InvalidAmount));
    }

    #[test]
    fn keywords_ignore_case() {
        assert!(is_all("ALL"));
        assert!(is_equal(" Equal "));
        assert_eq!(parse_confirmation("Yes"), Confirmation::Yes);
        assert_eq!(parse_confirmation("nope"), Confirmation::No);
        assert_eq!(parse_confirmation("y"), Confirmation::No);
    }

    #[test]
    fn commands_drop_bot_suffix() {
        assert_eq!(
            split_command("/Add_Member@splitbot  alice "),
            Some(("add_member".to_string(), "alice".to_string()))
        );
        assert_eq!(split_command("/undo"), Some(("undo".to_string(), String::new())));
        assert_eq!(split_command("hello"), None);
        assert_eq!(split_command("/"), None);
    }
}
