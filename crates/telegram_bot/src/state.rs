//! In-memory dialog state.
//!
//! Every dialog lives under a `(group, user, kind)` key. A user may have
//! several dialogs of different kinds open in the same group; plain text goes
//! to the most recently started one. Nothing here is persisted: a restart
//! drops every pending dialog.

use std::{collections::HashMap, sync::Arc};

use engine::Money;
use tokio::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum DialogKind {
    AddExpense,
    AddMember,
    SetCurrency,
    SettleAll,
    RemoveAllMembers,
    DeleteAll,
    CreateCategory,
    UpdateCategory,
    ShowSpending,
}

impl DialogKind {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::AddExpense => "add expense",
            Self::AddMember => "add member",
            Self::SetCurrency => "set currency",
            Self::SettleAll => "settle all",
            Self::RemoveAllMembers => "remove all members",
            Self::DeleteAll => "delete all",
            Self::CreateCategory => "create category",
            Self::UpdateCategory => "update category",
            Self::ShowSpending => "show spending",
        }
    }
}

/// Current step of a dialog together with the input collected so far.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dialog {
    AddExpense(AddExpenseStep),
    AddMember,
    SetCurrency,
    /// Yes/no gate of a destructive admin operation.
    Confirm(DialogKind),
    CreateCategory,
    UpdateCategory(UpdateCategoryStep),
    ShowSpending(ShowSpendingStep),
}

impl Dialog {
    pub(crate) fn kind(&self) -> DialogKind {
        match self {
            Self::AddExpense(_) => DialogKind::AddExpense,
            Self::AddMember => DialogKind::AddMember,
            Self::SetCurrency => DialogKind::SetCurrency,
            Self::Confirm(kind) => *kind,
            Self::CreateCategory => DialogKind::CreateCategory,
            Self::UpdateCategory(_) => DialogKind::UpdateCategory,
            Self::ShowSpending(_) => DialogKind::ShowSpending,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum AddExpenseStep {
    AwaitPurpose,
    AwaitPayer {
        purpose: String,
    },
    AwaitAmount {
        purpose: String,
        payer: String,
    },
    AwaitBeneficiaries {
        purpose: String,
        payer: String,
        amount: Money,
    },
    AwaitSplit {
        purpose: String,
        payer: String,
        amount: Money,
        beneficiaries: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum UpdateCategoryStep {
    AwaitCategory,
    AwaitPurpose { category: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ShowSpendingStep {
    AwaitCategory,
    /// `None` means every category.
    AwaitMember { category: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct DialogKey {
    group_id: i64,
    user: String,
    kind: DialogKind,
}

#[derive(Clone, Debug)]
struct Entry {
    started: u64,
    dialog: Dialog,
}

#[derive(Debug, Default)]
struct Dialogs {
    next: u64,
    entries: HashMap<DialogKey, Entry>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct DialogStore {
    inner: Arc<Mutex<Dialogs>>,
}

impl DialogStore {
    /// Opens a dialog, replacing any dialog of the same kind for that user.
    pub(crate) async fn start(&self, group_id: i64, user: &str, dialog: Dialog) {
        let mut guard = self.inner.lock().await;
        guard.next += 1;
        let started = guard.next;
        let key = DialogKey {
            group_id,
            user: user.to_string(),
            kind: dialog.kind(),
        };
        guard.entries.insert(key, Entry { started, dialog });
    }

    /// The most recently started dialog of the user in the group.
    pub(crate) async fn focused(&self, group_id: i64, user: &str) -> Option<Dialog> {
        let guard = self.inner.lock().await;
        guard
            .entries
            .iter()
            .filter(|(key, _)| key.group_id == group_id && key.user == user)
            .max_by_key(|(_, entry)| entry.started)
            .map(|(_, entry)| entry.dialog.clone())
    }

    /// Moves an open dialog to its next step, keeping its focus order. Does
    /// nothing if the dialog was closed meanwhile.
    pub(crate) async fn advance(&self, group_id: i64, user: &str, dialog: Dialog) {
        let mut guard = self.inner.lock().await;
        let key = DialogKey {
            group_id,
            user: user.to_string(),
            kind: dialog.kind(),
        };
        if let Some(entry) = guard.entries.get_mut(&key) {
            entry.dialog = dialog;
        }
    }

    /// Closes a dialog and returns it.
    pub(crate) async fn finish(&self, group_id: i64, user: &str, kind: DialogKind) -> Option<Dialog> {
        let mut guard = self.inner.lock().await;
        let key = DialogKey {
            group_id,
            user: user.to_string(),
            kind,
        };
        guard.entries.remove(&key).map(|entry| entry.dialog)
    }

    /// Drops every dialog of the group.
    pub(crate) async fn clear_group(&self, group_id: i64) {
        let mut guard = self.inner.lock().await;
        guard.entries.retain(|key, _| key.group_id != group_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn text_goes_to_the_latest_dialog() {
        let store = DialogStore::default();
        store.start(1, "alice", Dialog::AddMember).await;
        store.start(1, "alice", Dialog::CreateCategory).await;
        store.start(1, "bob", Dialog::SetCurrency).await;

        assert_eq!(store.focused(1, "alice").await, Some(Dialog::CreateCategory));
        assert_eq!(store.focused(1, "bob").await, Some(Dialog::SetCurrency));
        assert_eq!(store.focused(2, "alice").await, None);

        store.finish(1, "alice", DialogKind::CreateCategory).await;
        assert_eq!(store.focused(1, "alice").await, Some(Dialog::AddMember));
    }

    #[tokio::test]
    async fn restarting_a_kind_replaces_it() {
        let store = DialogStore::default();
        store
            .start(
                1,
                "alice",
                Dialog::AddExpense(AddExpenseStep::AwaitPayer {
                    purpose: "dinner".to_string(),
                }),
            )
            .await;
        store.start(1, "alice", Dialog::AddMember).await;
        store
            .start(1, "alice", Dialog::AddExpense(AddExpenseStep::AwaitPurpose))
            .await;

        assert_eq!(
            store.focused(1, "alice").await,
            Some(Dialog::AddExpense(AddExpenseStep::AwaitPurpose))
        );
    }

    #[tokio::test]
    async fn advance_ignores_closed_dialogs() {
        let store = DialogStore::default();
        store.advance(1, "alice", Dialog::AddMember).await;
        assert_eq!(store.focused(1, "alice").await, None);

        store.start(1, "alice", Dialog::AddMember).await;
        store.clear_group(1).await;
        assert_eq!(store.focused(1, "alice").await, None);
    }
}
