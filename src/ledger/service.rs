//! Account ledger
//!
//! Orchestrates every balance-changing and account-changing operation.
//! Each mutation is a load, validate, compute, conditional-save cycle
//! against the store; a lost version race reloads and starts over.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::domain::{
    Account, AccountNumber, Amount, DomainError, OperationContext, ProfileChanges,
    TransactionRecord,
};
use crate::error::AppResult;
use crate::security::PinHasher;
use crate::store::{Directory, LedgerStore, StoreError};

use super::commands::{
    CreateAccountCommand, DepositCommand, WithdrawCommand, INITIAL_DEPOSIT_DESCRIPTION,
};
use super::identifier::IdentifierGenerator;

/// Retry budgets for the two races the ledger resolves itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Attempts per operation when the account version moved underneath us
    pub conflict_retries: u32,
    /// Attempts per creation when the chosen number was claimed at commit time
    pub account_number_retries: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            conflict_retries: 3,
            account_number_retries: 5,
        }
    }
}

// =========================================================================
// AccountLedger
// =========================================================================

/// Entry point for all account mutations
pub struct AccountLedger {
    store: Arc<dyn LedgerStore>,
    directory: Arc<dyn Directory>,
    hasher: Arc<dyn PinHasher>,
    generator: IdentifierGenerator,
    settings: LedgerSettings,
}

impl AccountLedger {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        directory: Arc<dyn Directory>,
        hasher: Arc<dyn PinHasher>,
    ) -> Self {
        Self {
            store,
            directory,
            hasher,
            generator: IdentifierGenerator::new(),
            settings: LedgerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: LedgerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_generator(mut self, generator: IdentifierGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn settings(&self) -> LedgerSettings {
        self.settings
    }

    // =========================================================================
    // CreateAccount
    // =========================================================================

    /// Open an account, optionally funding it with an initial deposit.
    ///
    /// The account and its opening record are committed together, so a
    /// failed creation leaves nothing behind.
    #[tracing::instrument(
        skip(self, command, context),
        fields(user_id = %command.user_id, correlation_id = ?context.correlation_id)
    )]
    pub async fn create_account(
        &self,
        command: CreateAccountCommand,
        context: &OperationContext,
    ) -> AppResult<Account> {
        if self.directory.find_user(command.user_id).await?.is_none() {
            return Err(DomainError::user_not_found(command.user_id).into());
        }
        if let Some(bank_id) = command.bank_id {
            if self.directory.find_bank(bank_id).await?.is_none() {
                return Err(DomainError::bank_not_found(bank_id).into());
            }
        }

        // Validated before a number is allocated
        let initial_deposit = match command.initial_deposit {
            Some(amount) if amount.is_zero() => None,
            Some(amount) => Some(Amount::new(amount).map_err(DomainError::from)?),
            None => None,
        };

        let pin_hash = command
            .pin
            .as_deref()
            .map(|pin| self.hasher.hash(pin))
            .transpose()?;
        let account = self
            .insert_with_fresh_number(&command, pin_hash, initial_deposit.as_ref(), context)
            .await?;

        tracing::info!(
            account_number = %account.number(),
            account_type = %account.kind(),
            balance = %account.balance(),
            "Account opened"
        );
        Ok(account)
    }

    /// Insert the account, and its opening deposit record if funded, as one
    /// store write. A number claimed at commit time is regenerated.
    async fn insert_with_fresh_number(
        &self,
        command: &CreateAccountCommand,
        pin_hash: Option<String>,
        initial_deposit: Option<&Amount>,
        context: &OperationContext,
    ) -> AppResult<Account> {
        let attempts = self.settings.account_number_retries.max(1);
        let mut last_number = None;

        for attempt in 1..=attempts {
            let number = self.generator.generate(self.store.as_ref()).await?;
            let opened = Account::open(
                number.clone(),
                command.user_id,
                command.bank_id,
                command.profile.clone(),
                command.account_type,
                pin_hash.clone(),
            );
            let (account, opening) = match initial_deposit {
                Some(amount) => {
                    let (funded, record) = opened.deposit(
                        amount.value(),
                        Some(INITIAL_DEPOSIT_DESCRIPTION.to_string()),
                        context.performed_by(),
                    )?;
                    (funded, Some(record))
                }
                None => (opened, None),
            };

            match self
                .store
                .insert_account_with_transaction(&account, opening.as_ref())
                .await
            {
                Ok(()) => return Ok(account),
                Err(StoreError::DuplicateAccountNumber(_)) => {
                    tracing::warn!(
                        account_number = %number,
                        "Account number claimed concurrently, regenerating (attempt {}/{})",
                        attempt,
                        attempts
                    );
                    last_number = Some(number);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let number = last_number.map(|n| n.to_string()).unwrap_or_default();
        Err(DomainError::DuplicateIdentifier(number).into())
    }

    // =========================================================================
    // Deposit / Withdraw
    // =========================================================================

    /// Credit an account and append a DEPOSIT record
    #[tracing::instrument(
        skip(self, command, context),
        fields(account_number = %command.account_number, correlation_id = ?context.correlation_id)
    )]
    pub async fn deposit(
        &self,
        command: DepositCommand,
        context: &OperationContext,
    ) -> AppResult<TransactionRecord> {
        let command = &command;
        let record = self
            .retry_on_conflict(&command.account_number, move || {
                self.try_deposit(command, context)
            })
            .await?;

        tracing::info!(
            account_number = %command.account_number,
            amount = %record.amount,
            balance = %record.balance_after,
            "Deposit recorded"
        );
        Ok(record)
    }

    /// Single deposit attempt against a freshly loaded account
    async fn try_deposit(
        &self,
        command: &DepositCommand,
        context: &OperationContext,
    ) -> AppResult<TransactionRecord> {
        let account = self.load_by_number(&command.account_number).await?;
        let (next, record) = account.deposit(
            command.amount,
            command.description.clone(),
            context.performed_by(),
        )?;
        let record = self
            .store
            .save_account_and_append_transaction(&next, &record)
            .await?;
        Ok(record)
    }

    /// Debit an account and append a WITHDRAW record.
    ///
    /// PIN verification happens only when the command carries a PIN.
    #[tracing::instrument(
        skip(self, command, context),
        fields(account_number = %command.account_number, correlation_id = ?context.correlation_id)
    )]
    pub async fn withdraw(
        &self,
        command: WithdrawCommand,
        context: &OperationContext,
    ) -> AppResult<TransactionRecord> {
        let command = &command;
        let record = self
            .retry_on_conflict(&command.account_number, move || {
                self.try_withdraw(command, context)
            })
            .await?;

        tracing::info!(
            account_number = %command.account_number,
            amount = %record.amount,
            balance = %record.balance_after,
            "Withdrawal recorded"
        );
        Ok(record)
    }

    /// Single withdrawal attempt against a freshly loaded account
    async fn try_withdraw(
        &self,
        command: &WithdrawCommand,
        context: &OperationContext,
    ) -> AppResult<TransactionRecord> {
        let account = self.load_by_number(&command.account_number).await?;
        let (next, record) = account.withdraw(
            command.amount,
            command.pin.as_deref(),
            self.hasher.as_ref(),
            command.description.clone(),
            context.performed_by(),
        )?;
        let record = self
            .store
            .save_account_and_append_transaction(&next, &record)
            .await?;
        Ok(record)
    }

    // =========================================================================
    // Account maintenance
    // =========================================================================

    /// Close an account. Closing an inactive account succeeds without a write.
    #[tracing::instrument(skip(self, context), fields(correlation_id = ?context.correlation_id))]
    pub async fn deactivate(&self, account_id: Uuid, context: &OperationContext) -> AppResult<()> {
        self.retry_on_conflict(&account_id, move || self.try_deactivate(account_id))
            .await
    }

    async fn try_deactivate(&self, account_id: Uuid) -> AppResult<()> {
        let account = self.load_by_id(account_id).await?;
        match account.deactivate() {
            Some(closed) => {
                self.store.update_account(&closed).await?;
                tracing::info!(account_number = %closed.number(), "Account deactivated");
            }
            None => {
                tracing::debug!(account_number = %account.number(), "Account already inactive");
            }
        }
        Ok(())
    }

    /// Apply a partial profile update and return the resulting account
    #[tracing::instrument(skip(self, changes, context), fields(correlation_id = ?context.correlation_id))]
    pub async fn update_profile(
        &self,
        account_id: Uuid,
        changes: ProfileChanges,
        context: &OperationContext,
    ) -> AppResult<Account> {
        let changes = &changes;
        self.retry_on_conflict(&account_id, move || {
            self.try_update_profile(account_id, changes)
        })
        .await
    }

    async fn try_update_profile(
        &self,
        account_id: Uuid,
        changes: &ProfileChanges,
    ) -> AppResult<Account> {
        let account = self.load_by_id(account_id).await?;
        match account.with_profile(changes) {
            Some(updated) => {
                self.store.update_account(&updated).await?;
                tracing::info!(account_number = %updated.number(), "Profile updated");
                Ok(updated)
            }
            None => Ok(account),
        }
    }

    /// Replace the account PIN. The previous PIN is not required.
    #[tracing::instrument(
        skip(self, pin, context),
        fields(account_number = %account_number, correlation_id = ?context.correlation_id)
    )]
    pub async fn set_pin(
        &self,
        account_number: &AccountNumber,
        pin: &str,
        context: &OperationContext,
    ) -> AppResult<()> {
        let pin_hash = self.hasher.hash(pin)?;
        let pin_hash = pin_hash.as_str();
        self.retry_on_conflict(account_number, move || {
            self.try_set_pin(account_number, pin_hash)
        })
        .await?;

        tracing::info!(account_number = %account_number, "PIN updated");
        Ok(())
    }

    async fn try_set_pin(&self, account_number: &AccountNumber, pin_hash: &str) -> AppResult<()> {
        let account = self.load_by_number(account_number).await?;
        let updated = account.with_pin_hash(pin_hash.to_string());
        self.store.update_account(&updated).await?;
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load_by_number(&self, number: &AccountNumber) -> AppResult<Account> {
        self.store
            .get_account(number)
            .await?
            .ok_or_else(|| DomainError::account_not_found(number).into())
    }

    async fn load_by_id(&self, account_id: Uuid) -> AppResult<Account> {
        self.store
            .get_account_by_id(account_id)
            .await?
            .ok_or_else(|| DomainError::account_not_found(account_id).into())
    }

    /// Run `attempt` until it stops losing version races.
    ///
    /// Business-rule failures return immediately; only
    /// `StoreError::ConcurrencyConflict` triggers another attempt.
    async fn retry_on_conflict<T, F, Fut>(&self, account: &impl ToString, mut attempt: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let max_attempts = self.settings.conflict_retries.max(1);

        for n in 1..=max_attempts {
            match attempt().await {
                Err(e) if e.is_concurrency_conflict() && n < max_attempts => {
                    tracing::warn!(
                        "Concurrency conflict, retrying (attempt {}/{})",
                        n,
                        max_attempts
                    );
                    let delay = Duration::from_millis(50 * n as u64);
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_concurrency_conflict() => break,
                other => return other,
            }
        }

        Err(DomainError::Conflict {
            account: account.to_string(),
            attempts: max_attempts,
        }
        .into())
    }
}
