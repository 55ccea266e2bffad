//! Human-facing phrases and their default English rendering.
//!
//! The engine never formats user-visible text directly. It builds a [`Phrase`]
//! and hands it to a [`Localizer`], so hosts can plug in their own catalogue.

/// Every user-visible phrase the engine can emit, with its parameters.
///
/// Amounts are already formatted by [`Localizer::format_amount`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phrase {
    Attachment,
    Hidden,
    ListAnd,

    // Receipt and expense states
    Scanning,
    MissingDetails,
    RoutePending,
    Expense,
    TrackExpense,
    DeletedExpense,
    ReversedTransaction,
    DeletedMessage,
    DeletedTask,
    HeldExpense,
    UnheldExpense,

    // Money-request summaries
    SubmittedAmount { amount: String, comment: String },
    TrackedAmount { amount: String, comment: String },
    DidSplitAmount { amount: String, comment: String },
    PaidElsewhere { payer: String, amount: String },
    PaidWithWallet { payer: String, amount: String },
    PayerPaidAmount { payer: String, amount: String },
    PayerSettled { amount: String },
    ApprovedAmount { amount: String },
    ManagerApprovedAmount { manager: String, amount: String },
    PayerOwesAmount { payer: String, amount: String, comment: String },
    PayerSpentAmount { payer: String, amount: String },
    WaitingOnBankAccount { submitter: String },
    WaitingOnEnabledWallet { submitter: String },
    CanceledRequest { submitter: String, amount: String },
    AdminCanceledRequest { manager: String, amount: String },

    // Transaction thread names
    ThreadExpenseName { amount: String, comment: String },
    ThreadTrackName { amount: String, comment: String },
    ThreadSentMoneyName { amount: String, comment: String },

    // Member changes
    Invited,
    Removed,
    LeftWorkspace,
    To,
    From,

    ViolationDismissal { violation: String, reason: String },
    NotRoomMembers { mentions: String, plural: bool },
}

pub trait Localizer: Send + Sync {
    fn translate(&self, phrase: &Phrase) -> String;

    /// Renders an amount stored in the currency's minor unit.
    fn format_amount(&self, amount: i64, currency: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishLocalizer;

fn for_comment(comment: &str) -> String {
    if comment.is_empty() {
        String::new()
    } else {
        format!(" for {}", comment)
    }
}

fn with_space(prefix: &str) -> String {
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{} ", prefix)
    }
}

impl Localizer for EnglishLocalizer {
    fn translate(&self, phrase: &Phrase) -> String {
        match phrase {
            Phrase::Attachment => "[Attachment]".into(),
            Phrase::Hidden => "Hidden".into(),
            Phrase::ListAnd => "and".into(),
            Phrase::Scanning => "Scanning...".into(),
            Phrase::MissingDetails => "Receipt missing details".into(),
            Phrase::RoutePending => "Pending...".into(),
            Phrase::Expense => "Expense".into(),
            Phrase::TrackExpense => "Track expense".into(),
            Phrase::DeletedExpense => "[Deleted expense]".into(),
            Phrase::ReversedTransaction => "[Reversed transaction]".into(),
            Phrase::DeletedMessage => "[Deleted message]".into(),
            Phrase::DeletedTask => "[Deleted task]".into(),
            Phrase::HeldExpense => "held this expense".into(),
            Phrase::UnheldExpense => "unheld this expense".into(),
            Phrase::SubmittedAmount { amount, comment } => format!("submitted {}{}", amount, for_comment(comment)),
            Phrase::TrackedAmount { amount, comment } => format!("tracking {}{}", amount, for_comment(comment)),
            Phrase::DidSplitAmount { amount, comment } => format!("split {}{}", amount, for_comment(comment)),
            Phrase::PaidElsewhere { payer, amount } => format!("{}paid {} elsewhere", with_space(payer), amount),
            Phrase::PaidWithWallet { payer, amount } => format!("{}paid {} with wallet", with_space(payer), amount),
            Phrase::PayerPaidAmount { payer, amount } => format!("{}paid {}", with_space(payer), amount),
            Phrase::PayerSettled { amount } => format!("paid {}", amount),
            Phrase::ApprovedAmount { amount } => format!("approved {}", amount),
            Phrase::ManagerApprovedAmount { manager, amount } => format!("{} approved {}", manager, amount),
            Phrase::PayerOwesAmount { payer, amount, comment } => {
                format!("{} owes {}{}", payer, amount, for_comment(comment))
            }
            Phrase::PayerSpentAmount { payer, amount } => format!("{} spent {}", payer, amount),
            Phrase::WaitingOnBankAccount { submitter } => format!(
                "started settling up. Payment is on hold until {} adds a bank account.",
                submitter
            ),
            Phrase::WaitingOnEnabledWallet { submitter } => format!(
                "started settling up. Payment is on hold until {} enables their wallet.",
                submitter
            ),
            Phrase::CanceledRequest { submitter, amount } => format!(
                "canceled the {} payment, because {} did not enable their wallet within 30 days",
                amount, submitter
            ),
            Phrase::AdminCanceledRequest { manager, amount } => {
                let manager = if manager.is_empty() { String::new() } else { format!("{}: ", manager) };
                format!("{}canceled the {} payment.", manager, amount)
            }
            Phrase::ThreadExpenseName { amount, comment } => {
                if comment.is_empty() {
                    format!("{} expense", amount)
                } else {
                    format!("{} for {}", amount, comment)
                }
            }
            Phrase::ThreadTrackName { amount, comment } => format!("Tracking {}{}", amount, for_comment(comment)),
            Phrase::ThreadSentMoneyName { amount, comment } => format!("{} sent{}", amount, for_comment(comment)),
            Phrase::Invited => "invited".into(),
            Phrase::Removed => "removed".into(),
            Phrase::LeftWorkspace => "left the workspace".into(),
            Phrase::To => "to".into(),
            Phrase::From => "from".into(),
            Phrase::ViolationDismissal { violation, reason } => match (violation.as_str(), reason.as_str()) {
                ("rter", "manual") => "marked this receipt as cash.".into(),
                ("duplicatedTransaction", "manual") => "marked this expense as not a duplicate.".into(),
                (violation, _) => format!("dismissed the {} violation.", violation),
            },
            Phrase::NotRoomMembers { mentions, plural } => format!(
                "Heads up, {} {} of this room.",
                mentions,
                if *plural { "aren't members" } else { "isn't a member" }
            ),
        }
    }

    fn format_amount(&self, amount: i64, currency: &str) -> String {
        let (symbol, decimals) = match currency {
            "" | "USD" => ("$".to_string(), 2),
            "EUR" => ("€".to_string(), 2),
            "GBP" => ("£".to_string(), 2),
            "JPY" => ("¥".to_string(), 0),
            "CAD" => ("CA$".to_string(), 2),
            "AUD" => ("A$".to_string(), 2),
            other => (format!("{} ", other), 2),
        };
        let sign = if amount < 0 { "-" } else { "" };
        let cents = amount.unsigned_abs();
        let whole = group_thousands(cents / 100);
        if decimals == 0 {
            let rounded = group_thousands((cents + 50) / 100);
            return format!("{}{}{}", sign, symbol, rounded);
        }
        format!("{}{}{}.{:02}", sign, symbol, whole, cents % 100)
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        let l = EnglishLocalizer;
        assert_eq!(l.format_amount(1234, "USD"), "$12.34");
        assert_eq!(l.format_amount(-500, "EUR"), "-€5.00");
        assert_eq!(l.format_amount(123456789, "USD"), "$1,234,567.89");
        assert_eq!(l.format_amount(1250, "JPY"), "¥13");
        assert_eq!(l.format_amount(700, "CHF"), "CHF 7.00");
    }

    #[test]
    fn test_optional_comment() {
        let l = EnglishLocalizer;
        let with = Phrase::SubmittedAmount {
            amount: "$1.00".into(),
            comment: "lunch".into(),
        };
        let without = Phrase::SubmittedAmount {
            amount: "$1.00".into(),
            comment: String::new(),
        };
        assert_eq!(l.translate(&with), "submitted $1.00 for lunch");
        assert_eq!(l.translate(&without), "submitted $1.00");
    }

    #[test]
    fn test_payer_prefix() {
        let l = EnglishLocalizer;
        let anonymous = Phrase::PaidElsewhere {
            payer: String::new(),
            amount: "$2.00".into(),
        };
        assert_eq!(l.translate(&anonymous), "paid $2.00 elsewhere");

        let admin = Phrase::AdminCanceledRequest {
            manager: "Dana".into(),
            amount: "$2.00".into(),
        };
        assert_eq!(l.translate(&admin), "Dana: canceled the $2.00 payment.");
    }
}
