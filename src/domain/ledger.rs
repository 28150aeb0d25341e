use {
    super::id::PaymentId,
    super::money::Money,
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Authorization,
    CancelAuthorization,
    Charge,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorization => "Authorization",
            Self::CancelAuthorization => "CancelAuthorization",
            Self::Charge => "Charge",
            Self::Refund => "Refund",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    Initial,
    Pending,
    Success,
    Failure,
}

impl TransactionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "Initial",
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Failure => "Failure",
        }
    }

    /// Success and Failure are terminal; a transaction never moves backwards.
    pub fn can_transition_to(&self, next: &TransactionState) -> bool {
        matches!(
            (self, next),
            (Self::Initial, Self::Pending)
                | (Self::Initial, Self::Success)
                | (Self::Initial, Self::Failure)
                | (Self::Pending, Self::Success)
                | (Self::Pending, Self::Failure)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction as recorded on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub state: TransactionState,
    pub amount: Money,
    pub interaction_id: Option<String>,
}

/// A transaction the engine wants the ledger to hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub state: TransactionState,
    pub amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<String>,
}

impl TransactionDraft {
    fn same_operation(&self, tx: &Transaction) -> bool {
        tx.kind == self.kind && tx.interaction_id == self.interaction_id && tx.amount == self.amount
    }
}

/// One ledger update action, mirroring the commerce platform's update API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentAction {
    SetInterfaceId(String),
    AddTransaction(TransactionDraft),
    ChangeTransactionState {
        transaction_id: String,
        state: TransactionState,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionPlan {
    /// The identical PSP operation is already recorded.
    AlreadyApplied,
    /// The recorded operation sits in a terminal state the draft cannot reach.
    Anomaly { current: TransactionState },
    Apply(Vec<PaymentAction>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPayment {
    pub id: PaymentId,
    pub version: i64,
    pub amount_planned: Money,
    pub interface_id: Option<String>,
    pub transactions: Vec<Transaction>,
}

impl LedgerPayment {
    pub fn find_transaction(
        &self,
        kind: TransactionType,
        interaction_id: Option<&str>,
    ) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|tx| tx.kind == kind && tx.interaction_id.as_deref() == interaction_id)
    }

    pub fn has_transaction_in_state(&self, kind: TransactionType, states: &[TransactionState]) -> bool {
        self.transactions
            .iter()
            .any(|tx| tx.kind == kind && states.contains(&tx.state))
    }

    /// Decide how `draft` lands on this payment.
    ///
    /// An existing transaction with the same type, interaction id and amount is
    /// the same PSP operation: it is either already in the requested state, moved
    /// forward in place, or left alone when it is terminal. Anything else is a new
    /// transaction. `psp_reference` becomes the interface id only if none is set.
    pub fn plan_transaction(
        &self,
        psp_reference: Option<&str>,
        draft: &TransactionDraft,
    ) -> TransactionPlan {
        let same: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|tx| draft.same_operation(tx))
            .collect();

        if same.iter().any(|tx| tx.state == draft.state) {
            return TransactionPlan::AlreadyApplied;
        }

        let mut actions = Vec::with_capacity(2);
        if let (None, Some(reference)) = (&self.interface_id, psp_reference) {
            actions.push(PaymentAction::SetInterfaceId(reference.to_string()));
        }

        match same.iter().find(|tx| tx.state.can_transition_to(&draft.state)) {
            Some(tx) => actions.push(PaymentAction::ChangeTransactionState {
                transaction_id: tx.id.clone(),
                state: draft.state,
            }),
            None => {
                if let Some(tx) = same.first() {
                    return TransactionPlan::Anomaly { current: tx.state };
                }
                actions.push(PaymentAction::AddTransaction(draft.clone()));
            }
        }

        TransactionPlan::Apply(actions)
    }
}

/// Everything the ledger needs to create a payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraft {
    pub amount_planned: Money,
    pub payment_interface: String,
    pub interface_id: Option<String>,
    pub customer_id: Option<String>,
    pub anonymous_id: Option<String>,
    pub transactions: Vec<TransactionDraft>,
}
