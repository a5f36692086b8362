//! Group registry.
//!
//! The registry mints ledgers, indexes them by participant and charges the
//! optional creation fee. Each ledger lives behind its own lock, so writes to
//! one group are serialized while different groups proceed independently.
//! Every committed write is published on a broadcast channel before its lock
//! is released, so subscribers see events in commit order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};

use crate::amount::{Amount, Balance};
use crate::config::RegistryConfig;
use crate::ledger::{Expense, Ledger, LedgerError, Member, Settlement};
use crate::model::{Address, Command, Event, ExpenseId, GroupId, GroupInfo, Page, ReceiptHash};

mod error;
pub use error::RegistryError;

/// Creates ledgers and lets any address discover the ledgers it belongs to.
pub struct Registry {
    config: RegistryConfig,
    directory: Arc<RwLock<Directory>>,
    events: broadcast::Sender<Event>,
}

/// State shared across all ledgers.
#[derive(Default)]
struct Directory {
    groups: BTreeMap<GroupId, Arc<RwLock<Ledger>>>,
    /// Address -> groups it was admitted to, in admission order
    user_groups: HashMap<Address, Vec<GroupId>>,
    total_groups: u64,
    collected_fees: Amount,
}

impl Directory {
    fn index(&mut self, address: Address, group: GroupId) {
        let groups = self.user_groups.entry(address).or_default();
        if !groups.contains(&group) {
            groups.push(group);
        }
    }
}

/// Direct access to one ledger created by a [`Registry`].
#[derive(Clone)]
pub struct GroupHandle {
    id: GroupId,
    ledger: Arc<RwLock<Ledger>>,
    directory: Arc<RwLock<Directory>>,
    events: broadcast::Sender<Event>,
}

/// Public API
impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            directory: Arc::new(RwLock::new(Directory::default())),
            events,
        }
    }

    /// Receive every event committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Create a ledger owned by `caller`, who becomes its first member.
    pub fn create_group(
        &self,
        caller: &Address,
        name: &str,
        nickname: &str,
        payment: Amount,
    ) -> Result<GroupHandle, RegistryError> {
        let result = self.try_create_group(caller, name, nickname, payment);
        log_result(
            "create group",
            result.as_ref().ok().map(GroupHandle::id),
            caller,
            Some(payment),
            &result,
        );
        result
    }

    /// Owner-only: deactivate the group `group`.
    pub fn deactivate_group(
        &self,
        caller: &Address,
        group: GroupId,
    ) -> Result<Event, RegistryError> {
        self.group(group)?.deactivate(caller)
    }

    /// Apply a single command on top of the current state.
    pub fn apply(&self, command: Command) -> Result<Event, RegistryError> {
        match command {
            Command::CreateGroup {
                caller,
                name,
                nickname,
                payment,
            } => {
                let handle = self.create_group(&caller, &name, &nickname, payment)?;
                Ok(Event::GroupCreated {
                    group: handle.id(),
                    owner: caller,
                })
            }
            Command::AddMember {
                caller,
                group,
                member,
                nickname,
            } => self.group(group)?.add_member(&caller, member, &nickname),
            Command::AddExpense {
                caller,
                group,
                description,
                amount,
                participants,
                receipt,
            } => self.group(group)?.add_expense(
                &caller,
                &description,
                amount,
                &participants,
                receipt,
            ),
            Command::SettleDebt {
                caller,
                group,
                creditor,
                amount,
            } => self.group(group)?.settle_debt(&caller, &creditor, amount),
            Command::DeactivateGroup { caller, group } => self.deactivate_group(&caller, group),
        }
    }

    /// Apply every command of `stream` in order.
    pub async fn run(&self, mut stream: impl Stream<Item = Command> + Unpin) {
        while let Some(command) = stream.next().await {
            // a rejected command must not stop the run; it is already logged
            let _ = self.apply(command);
        }
    }

    pub fn group(&self, group: GroupId) -> Result<GroupHandle, RegistryError> {
        let ledger = self
            .read_directory()?
            .groups
            .get(&group)
            .cloned()
            .ok_or(RegistryError::GroupNotFound(group))?;
        Ok(self.handle(group, ledger))
    }

    /// Every group, in creation order.
    pub fn groups(&self) -> Result<Vec<GroupHandle>, RegistryError> {
        let directory = self.read_directory()?;
        Ok(directory
            .groups
            .iter()
            .map(|(&id, ledger)| self.handle(id, Arc::clone(ledger)))
            .collect())
    }

    pub fn get_group_info(&self, group: GroupId) -> Result<GroupInfo, RegistryError> {
        self.group(group)?.info()
    }

    /// Groups `address` created or was added to, in that order.
    pub fn get_user_groups(&self, address: &Address) -> Result<Vec<GroupId>, RegistryError> {
        Ok(self
            .read_directory()?
            .user_groups
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    pub fn get_total_groups_count(&self) -> Result<u64, RegistryError> {
        Ok(self.read_directory()?.total_groups)
    }

    pub fn creation_fee(&self) -> Amount {
        self.config.creation_fee
    }

    /// Sum of all payments received for group creation.
    pub fn collected_fees(&self) -> Result<Amount, RegistryError> {
        Ok(self.read_directory()?.collected_fees)
    }
}

/// Private API
impl Registry {
    fn try_create_group(
        &self,
        caller: &Address,
        name: &str,
        nickname: &str,
        payment: Amount,
    ) -> Result<GroupHandle, RegistryError> {
        if caller.is_empty() {
            return Err(RegistryError::InvalidInput("owner address is empty".into()));
        }
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidInput("group name is blank".into()));
        }
        if nickname.trim().is_empty() {
            return Err(RegistryError::InvalidInput("nickname is blank".into()));
        }
        if payment < self.config.creation_fee {
            return Err(RegistryError::InsufficientFee {
                required: self.config.creation_fee,
                paid: payment,
            });
        }

        let mut directory = self
            .directory
            .write()
            .map_err(|_| RegistryError::LockPoisoned("registry"))?;

        let collected_fees = directory
            .collected_fees
            .checked_add(payment)
            .ok_or_else(|| RegistryError::InvalidInput("collected fees would overflow".into()))?;

        let id = directory.total_groups + 1;
        let ledger = Arc::new(RwLock::new(Ledger::new(
            id,
            name,
            caller.clone(),
            nickname,
        )?));

        // the ledger is indexed in the same critical section that creates it
        directory.groups.insert(id, Arc::clone(&ledger));
        directory.index(caller.clone(), id);
        directory.total_groups = id;
        directory.collected_fees = collected_fees;

        publish(
            &self.events,
            Event::GroupCreated {
                group: id,
                owner: caller.clone(),
            },
        );

        Ok(self.handle(id, ledger))
    }

    fn handle(&self, id: GroupId, ledger: Arc<RwLock<Ledger>>) -> GroupHandle {
        GroupHandle {
            id,
            ledger,
            directory: Arc::clone(&self.directory),
            events: self.events.clone(),
        }
    }

    fn read_directory(&self) -> Result<RwLockReadGuard<'_, Directory>, RegistryError> {
        self.directory
            .read()
            .map_err(|_| RegistryError::LockPoisoned("registry"))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

/// Write API
impl GroupHandle {
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Owner-only: admit `member`, and index this group under its address.
    pub fn add_member(
        &self,
        caller: &Address,
        member: Address,
        nickname: &str,
    ) -> Result<Event, RegistryError> {
        let result = self.try_add_member(caller, member, nickname);
        log_result("add member", Some(self.id), caller, None, &result);
        result
    }

    pub fn add_expense(
        &self,
        caller: &Address,
        description: &str,
        amount: Amount,
        participants: &[Address],
        receipt: ReceiptHash,
    ) -> Result<Event, RegistryError> {
        let result = self.commit(|ledger| {
            ledger.add_expense(caller, description, amount, participants, receipt)
        });
        log_result("expense", Some(self.id), caller, Some(amount), &result);
        result
    }

    pub fn settle_debt(
        &self,
        caller: &Address,
        creditor: &Address,
        amount: Amount,
    ) -> Result<Event, RegistryError> {
        let result = self.commit(|ledger| ledger.settle_debt(caller, creditor, amount));
        log_result("settlement", Some(self.id), caller, Some(amount), &result);
        result
    }

    pub fn deactivate(&self, caller: &Address) -> Result<Event, RegistryError> {
        let result = self.commit(|ledger| ledger.deactivate(caller));
        log_result("deactivation", Some(self.id), caller, None, &result);
        result
    }
}

/// Read API
impl GroupHandle {
    /// Run `f` against a consistent view of the ledger.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> Result<R, RegistryError> {
        let ledger = self
            .ledger
            .read()
            .map_err(|_| RegistryError::LockPoisoned("ledger"))?;
        Ok(f(&ledger))
    }

    pub fn info(&self) -> Result<GroupInfo, RegistryError> {
        self.read(Ledger::info)
    }

    pub fn name(&self) -> Result<String, RegistryError> {
        self.read(|ledger| ledger.name().to_string())
    }

    pub fn member_info(&self, address: &Address) -> Result<Member, RegistryError> {
        Ok(self.read(|ledger| ledger.member_info(address).cloned())??)
    }

    pub fn members_paginated(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Page<Address>, RegistryError> {
        self.read(|ledger| ledger.members_paginated(offset, limit))
    }

    pub fn expense_count(&self) -> Result<usize, RegistryError> {
        self.read(Ledger::expense_count)
    }

    pub fn expense(&self, id: ExpenseId) -> Result<Option<Expense>, RegistryError> {
        self.read(|ledger| ledger.expense(id).cloned())
    }

    pub fn expenses_paginated(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Page<Expense>, RegistryError> {
        self.read(|ledger| ledger.expenses_paginated(offset, limit))
    }

    pub fn settlements_paginated(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Page<Settlement>, RegistryError> {
        self.read(|ledger| ledger.settlements_paginated(offset, limit))
    }

    pub fn balance(&self, address: &Address) -> Result<Balance, RegistryError> {
        Ok(self.read(|ledger| ledger.balance(address))??)
    }

    /// How much `caller` owes `creditor`.
    pub fn debt_to(&self, caller: &Address, creditor: &Address) -> Result<Amount, RegistryError> {
        self.read(|ledger| ledger.debt_to(caller, creditor))
    }
}

/// Private API
impl GroupHandle {
    fn write_ledger(&self) -> Result<RwLockWriteGuard<'_, Ledger>, RegistryError> {
        self.ledger
            .write()
            .map_err(|_| RegistryError::LockPoisoned("ledger"))
    }

    /// Run a ledger write under the ledger lock and publish its event before releasing it.
    fn commit(
        &self,
        write: impl FnOnce(&mut Ledger) -> Result<Event, LedgerError>,
    ) -> Result<Event, RegistryError> {
        let mut ledger = self.write_ledger()?;
        let event = write(&mut ledger)?;
        publish(&self.events, event.clone());
        Ok(event)
    }

    fn try_add_member(
        &self,
        caller: &Address,
        member: Address,
        nickname: &str,
    ) -> Result<Event, RegistryError> {
        // lock order: ledger, then directory
        let mut ledger = self.write_ledger()?;
        let mut directory = self
            .directory
            .write()
            .map_err(|_| RegistryError::LockPoisoned("registry"))?;

        let event = ledger.add_member(caller, member.clone(), nickname)?;
        directory.index(member, self.id);
        publish(&self.events, event.clone());
        Ok(event)
    }
}

fn publish(events: &broadcast::Sender<Event>, event: Event) {
    let group = event.group();
    if events.send(event).is_err() {
        debug!(group, "no event subscribers");
    }
}

/// Small helper to log operation results
fn log_result<T>(
    op: &str,
    group: Option<GroupId>,
    caller: &Address,
    amount: Option<Amount>,
    result: &Result<T, RegistryError>,
) {
    match (result, amount) {
        (Ok(_), Some(amt)) => {
            info!(group, caller = %caller, amount = %amt, "{op} applied");
        }
        (Ok(_), None) => {
            info!(group, caller = %caller, "{op} applied");
        }
        (Err(e), Some(amt)) => {
            info!(group, caller = %caller, amount = %amt, reason = %e, "{op} skipped");
        }
        (Err(e), None) => {
            info!(group, caller = %caller, reason = %e, "{op} skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ErrorKind;
    use std::thread;

    // test utils

    fn addr(name: &str) -> Address {
        Address::from(name)
    }

    fn amt(units: u64) -> Amount {
        Amount::from_units(units)
    }

    fn group_with(registry: &Registry, owner: &str, members: &[&str]) -> GroupHandle {
        let handle = registry
            .create_group(&addr(owner), "Trip", owner, Amount::ZERO)
            .unwrap();
        for member in members {
            handle.add_member(&addr(owner), addr(member), member).unwrap();
        }
        handle
    }

    // Creation

    #[test]
    fn create_group_indexes_owner() {
        let registry = Registry::default();
        let handle = registry
            .create_group(&addr("alice"), "Test Group", "Alice", Amount::ZERO)
            .unwrap();

        assert_eq!(handle.id(), 1);
        assert_eq!(registry.get_user_groups(&addr("alice")).unwrap(), vec![1]);
        assert_eq!(registry.get_total_groups_count().unwrap(), 1);

        let info = registry.get_group_info(1).unwrap();
        assert_eq!(info.name, "Test Group");
        assert_eq!(info.owner, addr("alice"));
        assert_eq!(info.member_count, 1);
        assert!(info.active);
        assert_eq!(handle.name().unwrap(), "Test Group");
    }

    #[test]
    fn user_groups_keep_creation_order() {
        let registry = Registry::default();
        registry
            .create_group(&addr("alice"), "Group 1", "Alice", Amount::ZERO)
            .unwrap();
        registry
            .create_group(&addr("bob"), "Group 2", "Bob", Amount::ZERO)
            .unwrap();
        registry
            .create_group(&addr("alice"), "Group 3", "Alice", Amount::ZERO)
            .unwrap();

        assert_eq!(registry.get_user_groups(&addr("alice")).unwrap(), vec![1, 3]);
        assert_eq!(registry.get_user_groups(&addr("bob")).unwrap(), vec![2]);
        assert!(registry.get_user_groups(&addr("carol")).unwrap().is_empty());
        assert_eq!(registry.get_total_groups_count().unwrap(), 3);
    }

    #[test]
    fn create_group_with_empty_name_fails() {
        let registry = Registry::default();
        let result = registry.create_group(&addr("alice"), "", "Alice", Amount::ZERO);
        assert!(matches!(result, Err(RegistryError::InvalidInput(_))));

        let result = registry.create_group(&addr("alice"), "Trip", "", Amount::ZERO);
        assert!(matches!(result, Err(RegistryError::InvalidInput(_))));

        assert_eq!(registry.get_total_groups_count().unwrap(), 0);
        assert!(registry.get_user_groups(&addr("alice")).unwrap().is_empty());
    }

    #[test]
    fn creation_fee_is_enforced() {
        let registry = Registry::new(RegistryConfig::with_creation_fee(amt(100)));
        assert_eq!(registry.creation_fee(), amt(100));

        let result = registry.create_group(&addr("alice"), "Trip", "Alice", amt(99));
        assert!(matches!(
            result,
            Err(RegistryError::InsufficientFee { required, paid })
                if required == amt(100) && paid == amt(99)
        ));
        assert_eq!(registry.get_total_groups_count().unwrap(), 0);

        registry
            .create_group(&addr("alice"), "Trip", "Alice", amt(100))
            .unwrap();
        assert_eq!(registry.collected_fees().unwrap(), amt(100));
    }

    #[test]
    fn create_group_with_empty_owner_fails() {
        let registry = Registry::default();
        let result = registry.create_group(&addr(""), "Trip", "Anon", Amount::ZERO);
        assert!(matches!(result, Err(RegistryError::InvalidInput(_))));
        assert_eq!(registry.get_total_groups_count().unwrap(), 0);
        assert!(registry.get_user_groups(&addr("")).unwrap().is_empty());
    }

    #[test]
    fn blank_group_name_is_reported_as_blank() {
        let registry = Registry::default();
        let result = registry.create_group(&addr("alice"), "  ", "Alice", Amount::ZERO);
        assert!(matches!(
            result,
            Err(RegistryError::InvalidInput(reason)) if reason == "group name is blank"
        ));
    }

    #[test]
    fn fee_overflow_rejects_creation() {
        let registry = Registry::default();
        registry
            .create_group(&addr("alice"), "Trip", "Alice", Amount::from_units(u64::MAX))
            .unwrap();

        let result = registry.create_group(&addr("bob"), "Flat", "Bob", amt(1));
        assert!(matches!(result, Err(RegistryError::InvalidInput(_))));
        assert_eq!(registry.get_total_groups_count().unwrap(), 1);
        assert!(registry.get_user_groups(&addr("bob")).unwrap().is_empty());
        assert_eq!(
            registry.collected_fees().unwrap(),
            Amount::from_units(u64::MAX)
        );
    }

    #[test]
    fn unknown_group_is_not_found() {
        let registry = Registry::default();
        let result = registry.group(42);
        assert!(matches!(result, Err(RegistryError::GroupNotFound(42))));
        assert_eq!(
            registry.get_group_info(42).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    // Membership indexing

    #[test]
    fn added_member_discovers_group() {
        let registry = Registry::default();
        let handle = group_with(&registry, "alice", &["bob"]);

        assert_eq!(registry.get_user_groups(&addr("bob")).unwrap(), vec![handle.id()]);
        assert_eq!(handle.member_info(&addr("bob")).unwrap().nickname, "bob");
    }

    #[test]
    fn rejected_member_is_not_indexed() {
        let registry = Registry::default();
        let handle = group_with(&registry, "alice", &[]);

        let result = handle.add_member(&addr("bob"), addr("carol"), "Carol");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Unauthorized);
        assert!(registry.get_user_groups(&addr("carol")).unwrap().is_empty());
    }

    #[test]
    fn deactivated_group_stays_indexed() {
        let registry = Registry::default();
        let handle = group_with(&registry, "alice", &["bob"]);
        registry.deactivate_group(&addr("alice"), handle.id()).unwrap();

        assert_eq!(registry.get_user_groups(&addr("bob")).unwrap(), vec![1]);
        assert!(!registry.get_group_info(1).unwrap().active);
    }

    // Ledger access through the handle

    #[test]
    fn handle_reads_and_writes_the_same_ledger() {
        let registry = Registry::default();
        let handle = group_with(&registry, "alice", &["bob", "carol"]);
        handle
            .add_expense(
                &addr("alice"),
                "Dinner",
                amt(300),
                &[addr("alice"), addr("bob"), addr("carol")],
                ReceiptHash::ABSENT,
            )
            .unwrap();

        let again = registry.group(handle.id()).unwrap();
        assert_eq!(again.expense_count().unwrap(), 1);
        assert_eq!(again.balance(&addr("alice")).unwrap(), Balance::from_units(200));
        assert_eq!(again.debt_to(&addr("bob"), &addr("alice")).unwrap(), amt(100));

        again.settle_debt(&addr("bob"), &addr("alice"), amt(100)).unwrap();
        assert_eq!(handle.debt_to(&addr("bob"), &addr("alice")).unwrap(), Amount::ZERO);
        assert_eq!(handle.settlements_paginated(0, 10).unwrap().total, 1);
    }

    #[test]
    fn deactivation_is_final() {
        let registry = Registry::default();
        let handle = group_with(&registry, "alice", &["bob"]);
        handle
            .add_expense(
                &addr("alice"),
                "x",
                amt(10),
                &[addr("bob")],
                ReceiptHash::ABSENT,
            )
            .unwrap();
        handle.deactivate(&addr("alice")).unwrap();

        let failures = [
            handle.add_member(&addr("alice"), addr("dave"), "Dave"),
            handle.add_expense(
                &addr("alice"),
                "x",
                amt(10),
                &[addr("bob")],
                ReceiptHash::ABSENT,
            ),
            handle.settle_debt(&addr("bob"), &addr("alice"), amt(10)),
        ];
        for failure in failures {
            assert_eq!(failure.unwrap_err().kind(), ErrorKind::GroupInactive);
        }
        assert!(matches!(
            registry.deactivate_group(&addr("alice"), handle.id()),
            Err(RegistryError::Ledger(LedgerError::AlreadyInactive))
        ));

        assert_eq!(handle.balance(&addr("bob")).unwrap(), Balance::from_units(-10));
        assert_eq!(handle.members_paginated(0, 10).unwrap().total, 2);
    }

    // Events

    #[test]
    fn events_are_published_in_commit_order() {
        let registry = Registry::default();
        let mut events = registry.subscribe();

        let handle = group_with(&registry, "alice", &["bob"]);
        handle
            .add_expense(
                &addr("alice"),
                "Lunch",
                amt(20),
                &[addr("alice"), addr("bob")],
                ReceiptHash::ABSENT,
            )
            .unwrap();
        // rejected writes publish nothing
        let _ = handle.settle_debt(&addr("bob"), &addr("alice"), amt(11));
        handle.settle_debt(&addr("bob"), &addr("alice"), amt(10)).unwrap();
        handle.deactivate(&addr("alice")).unwrap();

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }

        assert_eq!(
            received,
            vec![
                Event::GroupCreated {
                    group: 1,
                    owner: addr("alice"),
                },
                Event::MemberAdded {
                    group: 1,
                    member: addr("bob"),
                    nickname: "bob".into(),
                },
                Event::ExpenseAdded {
                    group: 1,
                    id: 0,
                    paid_by: addr("alice"),
                    total_amount: amt(20),
                },
                Event::DebtSettled {
                    group: 1,
                    debtor: addr("bob"),
                    creditor: addr("alice"),
                    amount: amt(10),
                },
                Event::GroupDeactivated { group: 1 },
            ]
        );
    }

    // Commands

    #[test]
    fn apply_routes_commands_to_groups() {
        let registry = Registry::default();
        let created = registry
            .apply(Command::CreateGroup {
                caller: addr("alice"),
                name: "Flat".into(),
                nickname: "Alice".into(),
                payment: Amount::ZERO,
            })
            .unwrap();
        assert_eq!(
            created,
            Event::GroupCreated {
                group: 1,
                owner: addr("alice"),
            }
        );

        registry
            .apply(Command::AddMember {
                caller: addr("alice"),
                group: 1,
                member: addr("bob"),
                nickname: "Bob".into(),
            })
            .unwrap();
        registry
            .apply(Command::AddExpense {
                caller: addr("bob"),
                group: 1,
                description: "Rent".into(),
                amount: amt(1000),
                participants: vec![addr("alice"), addr("bob")],
                receipt: ReceiptHash::ABSENT,
            })
            .unwrap();

        let result = registry.apply(Command::SettleDebt {
            caller: addr("alice"),
            group: 2,
            creditor: addr("bob"),
            amount: amt(500),
        });
        assert!(matches!(result, Err(RegistryError::GroupNotFound(2))));

        registry
            .apply(Command::SettleDebt {
                caller: addr("alice"),
                group: 1,
                creditor: addr("bob"),
                amount: amt(500),
            })
            .unwrap();
        registry
            .apply(Command::DeactivateGroup {
                caller: addr("alice"),
                group: 1,
            })
            .unwrap();

        let info = registry.get_group_info(1).unwrap();
        assert!(!info.active);
        assert_eq!(info.member_count, 2);
    }

    #[tokio::test]
    async fn run_skips_rejected_commands_and_continues() {
        let registry = Registry::default();
        let commands = vec![
            Command::CreateGroup {
                caller: addr("alice"),
                name: "Flat".into(),
                nickname: "Alice".into(),
                payment: Amount::ZERO,
            },
            // bob is not the owner
            Command::AddMember {
                caller: addr("bob"),
                group: 1,
                member: addr("bob"),
                nickname: "Bob".into(),
            },
            Command::AddMember {
                caller: addr("alice"),
                group: 1,
                member: addr("carol"),
                nickname: "Carol".into(),
            },
        ];

        registry.run(tokio_stream::iter(commands)).await;

        let handle = registry.group(1).unwrap();
        assert_eq!(
            handle.members_paginated(0, 10).unwrap().items,
            vec![addr("alice"), addr("carol")]
        );
    }

    // Concurrency

    #[test]
    fn concurrent_expenses_are_serialized_per_group() {
        let registry = Registry::default();
        let handle = group_with(&registry, "alice", &["bob", "carol"]);
        let members = [addr("alice"), addr("bob"), addr("carol")];

        thread::scope(|scope| {
            for payer in &members {
                let handle = handle.clone();
                let members = &members;
                scope.spawn(move || {
                    for i in 1..=50u64 {
                        handle
                            .add_expense(payer, "x", amt(i), members, ReceiptHash::ABSENT)
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(handle.expense_count().unwrap(), 150);
        let total = handle.read(Ledger::total_balance).unwrap();
        assert!(total.is_zero());

        let ids: Vec<_> = handle
            .expenses_paginated(0, 200)
            .unwrap()
            .items
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, (0..150).collect::<Vec<_>>());
    }

    #[test]
    fn concurrent_creation_indexes_every_group() {
        let registry = Registry::default();
        thread::scope(|scope| {
            for user in ["alice", "bob", "carol", "dave"] {
                let registry = &registry;
                scope.spawn(move || {
                    for _ in 0..25 {
                        registry
                            .create_group(&addr(user), "Trip", user, Amount::ZERO)
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(registry.get_total_groups_count().unwrap(), 100);
        let mut all: Vec<_> = ["alice", "bob", "carol", "dave"]
            .iter()
            .flat_map(|u| registry.get_user_groups(&addr(u)).unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (1..=100).collect::<Vec<_>>());
    }
}
