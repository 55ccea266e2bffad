//! Text for MODIFIEDEXPENSE actions.

use quill_types::action::ModifiedExpenseMessage;

use crate::context::Context;

/// Renders the diff stored on a modified-expense action.
pub trait ModifiedExpenseFormatter: Send + Sync {
    fn format(&self, ctx: &Context<'_>, message: &ModifiedExpenseMessage) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishModifiedExpense;

fn describe(field: &str, old: Option<&str>, new: Option<&str>) -> Option<String> {
    let old = old.filter(|v| !v.is_empty());
    let new = new.filter(|v| !v.is_empty());
    match (old, new) {
        (Some(old), Some(new)) => Some(format!("changed the {} to {} (previously {})", field, new, old)),
        (None, Some(new)) => Some(format!("set the {} to {}", field, new)),
        (Some(old), None) => Some(format!("removed the {} (previously {})", field, old)),
        (None, None) => None,
    }
}

impl ModifiedExpenseFormatter for EnglishModifiedExpense {
    fn format(&self, ctx: &Context<'_>, message: &ModifiedExpenseMessage) -> String {
        let amount = |amount: Option<i64>, currency: &Option<String>| {
            amount.map(|a| ctx.format_amount(a, currency.as_deref().unwrap_or_default()))
        };
        let old_amount = amount(message.old_amount, &message.old_currency);
        let new_amount = amount(message.amount, &message.currency);

        let changes: Vec<String> = [
            describe("amount", old_amount.as_deref(), new_amount.as_deref()),
            describe("description", message.old_comment.as_deref(), message.new_comment.as_deref()),
            describe("date", message.old_created.as_deref(), message.created.as_deref()),
            describe("merchant", message.old_merchant.as_deref(), message.merchant.as_deref()),
            describe("category", message.old_category.as_deref(), message.category.as_deref()),
            describe("tag", message.old_tag.as_deref(), message.tag.as_deref()),
            describe("expense", message.old_billable.as_deref(), message.billable.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect();

        match changes.split_last() {
            None => "edited this expense".to_string(),
            Some((only, [])) => only.clone(),
            Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Snapshot;
    use crate::source::Replica;

    fn render(message: &ModifiedExpenseMessage) -> String {
        let snapshot = Snapshot::new(1, "me@example.com");
        let replica = Replica::new();
        let ctx = Context::new(&snapshot, &replica, &replica);
        EnglishModifiedExpense.format(&ctx, message)
    }

    #[test]
    fn test_amount_change() {
        let message = ModifiedExpenseMessage {
            old_amount: Some(1000),
            old_currency: Some("USD".into()),
            amount: Some(2500),
            currency: Some("USD".into()),
            ..Default::default()
        };
        assert_eq!(render(&message), "changed the amount to $25.00 (previously $10.00)");
    }

    #[test]
    fn test_set_and_remove() {
        let message = ModifiedExpenseMessage {
            old_category: Some(String::new()),
            category: Some("Travel".into()),
            old_tag: Some("Q3".into()),
            tag: Some(String::new()),
            old_merchant: Some("Cafe".into()),
            merchant: Some("Bistro".into()),
            ..Default::default()
        };
        assert_eq!(
            render(&message),
            "changed the merchant to Bistro (previously Cafe), set the category to Travel and removed the tag (previously Q3)"
        );
    }

    #[test]
    fn test_empty_diff() {
        assert_eq!(render(&ModifiedExpenseMessage::default()), "edited this expense");
    }
}
