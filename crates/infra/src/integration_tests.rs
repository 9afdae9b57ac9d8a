//! Integration tests for module composition and operation scopes.
//!
//! Tests: Registrar → ServiceRegistry → ServiceProvider → OperationScope → EventBus
//!
//! Verifies:
//! - Modules register in order, exactly once, and the first failure stops bootstrap
//! - Later modules can depend on services of earlier ones
//! - Raised events are published only after every participant commits, in raise order
//! - A module's participant is found by the name it registered, never by type alone

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use agora_events::{CancellationToken, Event, EventHandler, PublishError};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;

    use crate::config::Configuration;
    use crate::modules::{Module, ModuleRegistrar, RegistrationError, ServiceError, ServiceRegistry};
    use crate::operation::OperationError;
    use crate::unit_of_work::{InMemoryParticipant, InMemoryTable, Participant};

    type Journal = Arc<Mutex<Vec<String>>>;

    fn journal() -> Journal {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    /// Records its registration; optionally fails.
    struct Recording {
        name: &'static str,
        fail: bool,
        journal: Journal,
    }

    impl Module for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        fn register(&self, _: &mut ServiceRegistry, _: &Configuration) -> anyhow::Result<()> {
            self.journal.lock().unwrap().push(self.name.to_string());
            if self.fail {
                anyhow::bail!("{} cannot start", self.name);
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Directory;

    struct ProvidesDirectory;

    impl Module for ProvidesDirectory {
        fn name(&self) -> &'static str {
            "directory"
        }

        fn register(&self, services: &mut ServiceRegistry, _: &Configuration) -> anyhow::Result<()> {
            services.insert_value(Directory)?;
            Ok(())
        }
    }

    struct NeedsDirectory;

    impl Module for NeedsDirectory {
        fn name(&self) -> &'static str {
            "mailer"
        }

        fn register(&self, services: &mut ServiceRegistry, _: &Configuration) -> anyhow::Result<()> {
            services.require::<Directory>()?;
            Ok(())
        }
    }

    #[derive(Debug, Clone)]
    struct ProfileUpdated {
        user: u32,
    }

    impl Event for ProfileUpdated {
        fn event_type(&self) -> &'static str {
            "profiles.updated"
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Records the committed profile it observes when the event arrives.
    struct SeesCommittedState {
        table: Arc<InMemoryTable<u32, String>>,
        journal: Journal,
    }

    #[async_trait]
    impl EventHandler<ProfileUpdated> for SeesCommittedState {
        async fn handle(&self, event: &ProfileUpdated, _: &CancellationToken) -> anyhow::Result<()> {
            let seen = self.table.get(&event.user).unwrap_or_else(|| "<missing>".to_string());
            self.journal.lock().unwrap().push(format!("event:{seen}"));
            Ok(())
        }
    }

    struct FailingBoundary;

    #[async_trait]
    impl Participant for FailingBoundary {
        fn name(&self) -> &str {
            "audit"
        }

        fn has_pending_changes(&self) -> bool {
            true
        }

        async fn commit(&self, _: &CancellationToken) -> anyhow::Result<()> {
            anyhow::bail!("audit store offline")
        }
    }

    /// Profiles module: one table, one participant per operation, one handler.
    struct Profiles {
        table: Arc<InMemoryTable<u32, String>>,
        journal: Journal,
    }

    impl Module for Profiles {
        fn name(&self) -> &'static str {
            "profiles"
        }

        fn register(&self, services: &mut ServiceRegistry, _: &Configuration) -> anyhow::Result<()> {
            let table = self.table.clone();
            services.add_participant_factory("profiles", move || InMemoryParticipant::new("profiles", table.clone()))?;
            services.handlers().subscribe::<ProfileUpdated, _>(SeesCommittedState {
                table: self.table.clone(),
                journal: self.journal.clone(),
            });
            Ok(())
        }
    }

    /// Owns one table under its own participant name; no handlers.
    struct Table {
        name: &'static str,
        table: Arc<InMemoryTable<u32, String>>,
    }

    impl Module for Table {
        fn name(&self) -> &'static str {
            self.name
        }

        fn register(&self, services: &mut ServiceRegistry, _: &Configuration) -> anyhow::Result<()> {
            let (name, table) = (self.name, self.table.clone());
            services.add_participant_factory(name, move || InMemoryParticipant::new(name, table.clone()))?;
            Ok(())
        }
    }

    /// Records every update it sees and rejects one user.
    struct RejectsUser {
        user: u32,
        journal: Journal,
    }

    #[async_trait]
    impl EventHandler<ProfileUpdated> for RejectsUser {
        async fn handle(&self, event: &ProfileUpdated, _: &CancellationToken) -> anyhow::Result<()> {
            self.journal.lock().unwrap().push(format!("seen:{}", event.user));
            if event.user == self.user {
                anyhow::bail!("search index rejected user {}", event.user);
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "search-index"
        }
    }

    struct SearchIndex {
        rejects: u32,
        journal: Journal,
    }

    impl Module for SearchIndex {
        fn name(&self) -> &'static str {
            "search"
        }

        fn register(&self, services: &mut ServiceRegistry, _: &Configuration) -> anyhow::Result<()> {
            services.handlers().subscribe::<ProfileUpdated, _>(RejectsUser {
                user: self.rejects,
                journal: self.journal.clone(),
            });
            Ok(())
        }
    }

    fn registrar(modules: &[(&'static str, bool)], journal: &Journal) -> ModuleRegistrar {
        modules.iter().fold(ModuleRegistrar::default(), |registrar, &(name, fail)| {
            registrar.with_module(Recording {
                name,
                fail,
                journal: journal.clone(),
            })
        })
    }

    #[test]
    fn modules_register_in_supplied_order() {
        let journal = journal();
        let registrar = registrar(&[("profiles", false), ("feed", false), ("chat", false)], &journal);

        let mut services = ServiceRegistry::new();
        registrar.apply(&mut services, &Configuration::new()).unwrap();

        assert_eq!(registrar.module_names(), vec!["profiles", "feed", "chat"]);
        assert_eq!(entries(&journal), vec!["profiles", "feed", "chat"]);
    }

    #[test]
    fn failing_module_stops_bootstrap() {
        let journal = journal();
        let registrar = registrar(&[("profiles", false), ("feed", true), ("chat", false)], &journal);

        let err = registrar.compose(&Configuration::new()).unwrap_err();

        assert_eq!(err.module(), "feed");
        assert_eq!(err.position(), 1);
        let RegistrationError::Module { source, .. } = &err;
        assert_eq!(source.to_string(), "feed cannot start");
        assert_eq!(entries(&journal), vec!["profiles", "feed"]);
    }

    #[test]
    fn later_modules_see_services_of_earlier_ones() {
        let provider = ModuleRegistrar::default()
            .with_module(ProvidesDirectory)
            .with_module(NeedsDirectory)
            .compose(&Configuration::new())
            .unwrap();
        assert!(provider.get::<Directory>().is_some());
    }

    #[test]
    fn wrong_order_surfaces_missing_service() {
        let err = ModuleRegistrar::default()
            .with_module(NeedsDirectory)
            .with_module(ProvidesDirectory)
            .compose(&Configuration::new())
            .unwrap_err();

        let RegistrationError::Module { module, source, .. } = &err;
        assert_eq!(*module, "mailer");
        assert!(matches!(
            source.downcast_ref::<ServiceError>(),
            Some(ServiceError::Missing { .. })
        ));
    }

    #[test]
    fn duplicate_service_fails_the_second_module() {
        let err = ModuleRegistrar::default()
            .with_module(ProvidesDirectory)
            .with_module(ProvidesDirectory)
            .compose(&Configuration::new())
            .unwrap_err();

        assert_eq!(err.position(), 1);
        let RegistrationError::Module { source, .. } = &err;
        assert!(matches!(
            source.downcast_ref::<ServiceError>(),
            Some(ServiceError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn events_are_published_after_commit() {
        let journal = journal();
        let table = Arc::new(InMemoryTable::new());
        let provider = ModuleRegistrar::default()
            .with_module(Profiles {
                table: table.clone(),
                journal: journal.clone(),
            })
            .compose(&Configuration::new())
            .unwrap();

        let mut scope = provider.begin_operation();
        let profiles = scope
            .participant::<InMemoryParticipant<u32, String>>("profiles")
            .expect("profiles participant attached");
        profiles.stage_upsert(1, "ada".to_string()).unwrap();
        scope.raise(ProfileUpdated { user: 1 });
        assert_eq!(scope.pending_events(), vec!["profiles.updated"]);

        let report = scope.complete(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.committed, vec!["profiles"]);
        assert_eq!(entries(&journal), vec!["event:ada"]);
    }

    #[tokio::test]
    async fn failed_commit_publishes_nothing() {
        let journal = journal();
        let table = Arc::new(InMemoryTable::new());
        let provider = ModuleRegistrar::default()
            .with_module(Profiles {
                table: table.clone(),
                journal: journal.clone(),
            })
            .compose(&Configuration::new())
            .unwrap();

        let mut scope = provider.begin_operation();
        scope
            .participant::<InMemoryParticipant<u32, String>>("profiles")
            .unwrap()
            .stage_upsert(2, "grace".to_string())
            .unwrap();
        scope.attach(Arc::new(FailingBoundary));
        scope.raise(ProfileUpdated { user: 2 });

        let err = scope.complete(&CancellationToken::new()).await.unwrap_err();

        match err {
            OperationError::Commit(commit) => {
                assert_eq!(commit.failed_participant(), Some("audit"));
                assert_eq!(commit.committed(), ["profiles".to_string()]);
            }
            other => panic!("expected commit failure, got {other:?}"),
        }
        // Partial commit: profiles stays written, but nobody was told.
        assert_eq!(table.get(&2).as_deref(), Some("grace"));
        assert!(entries(&journal).is_empty());
    }

    #[tokio::test]
    async fn each_operation_gets_fresh_participants() {
        let provider = ModuleRegistrar::default()
            .with_module(Profiles {
                table: Arc::new(InMemoryTable::new()),
                journal: journal(),
            })
            .compose(&Configuration::new())
            .unwrap();

        let first = provider.begin_operation();
        first
            .participant::<InMemoryParticipant<u32, String>>("profiles")
            .unwrap()
            .stage_upsert(3, "linus".to_string())
            .unwrap();

        let second = provider.begin_operation();
        assert_ne!(first.id(), second.id());
        let staged = second
            .participant::<InMemoryParticipant<u32, String>>("profiles")
            .unwrap()
            .pending_len();
        assert_eq!(staged, 0);
    }

    #[tokio::test]
    async fn same_participant_type_stays_with_its_module() {
        let profiles = Arc::new(InMemoryTable::new());
        let tags = Arc::new(InMemoryTable::new());
        let provider = ModuleRegistrar::default()
            .with_module(Table {
                name: "profiles",
                table: profiles.clone(),
            })
            .with_module(Table {
                name: "tags",
                table: tags.clone(),
            })
            .compose(&Configuration::new())
            .unwrap();
        assert_eq!(provider.participant_names(), vec!["profiles", "tags"]);

        let scope = provider.begin_operation();
        scope
            .participant::<InMemoryParticipant<u32, String>>("tags")
            .unwrap()
            .stage_upsert(1, "rust".to_string())
            .unwrap();
        assert!(scope.participant::<InMemoryParticipant<u32, String>>("audit").is_none());
        assert!(scope.participant::<FailingBoundary>("tags").is_none());

        let report = scope.complete(&CancellationToken::new()).await.unwrap();

        assert_eq!(report.committed, vec!["profiles", "tags"]);
        assert!(profiles.is_empty());
        assert_eq!(tags.get(&1).as_deref(), Some("rust"));
    }

    #[test]
    fn second_participant_with_same_name_fails_registration() {
        let err = ModuleRegistrar::default()
            .with_module(Table {
                name: "profiles",
                table: Arc::new(InMemoryTable::new()),
            })
            .with_module(Table {
                name: "profiles",
                table: Arc::new(InMemoryTable::new()),
            })
            .compose(&Configuration::new())
            .unwrap_err();

        assert_eq!(err.position(), 1);
        let RegistrationError::Module { source, .. } = &err;
        assert_eq!(
            source.downcast_ref::<ServiceError>(),
            Some(&ServiceError::DuplicateParticipant { participant: "profiles" })
        );
    }

    #[tokio::test]
    async fn handler_failure_after_commit_keeps_writes_and_reports_undelivered_events() {
        let journal = journal();
        let table = Arc::new(InMemoryTable::new());
        let provider = ModuleRegistrar::default()
            .with_module(Table {
                name: "profiles",
                table: table.clone(),
            })
            .with_module(SearchIndex {
                rejects: 2,
                journal: journal.clone(),
            })
            .compose(&Configuration::new())
            .unwrap();

        let mut scope = provider.begin_operation();
        scope
            .participant::<InMemoryParticipant<u32, String>>("profiles")
            .unwrap()
            .stage_upsert(1, "ada".to_string())
            .unwrap();
        scope
            .raise(ProfileUpdated { user: 1 })
            .raise(ProfileUpdated { user: 2 })
            .raise(ProfileUpdated { user: 3 });

        let err = scope.complete(&CancellationToken::new()).await.unwrap_err();

        match &err {
            OperationError::Publish { source, undelivered } => {
                assert!(matches!(
                    source,
                    PublishError::Handler {
                        handler: "search-index",
                        ..
                    }
                ));
                assert_eq!(*undelivered, vec!["profiles.updated"]);
            }
            other => panic!("expected publish failure, got {other:?}"),
        }
        // Raise order is publish order; the third event never went out.
        assert_eq!(entries(&journal), vec!["seen:1", "seen:2"]);
        assert_eq!(table.get(&1).as_deref(), Some("ada"));
    }

    proptest! {
        #[test]
        fn registration_stops_at_first_failure(len in 1usize..8, seed in any::<usize>()) {
            let fail_at = seed % len;
            let names = ["m0", "m1", "m2", "m3", "m4", "m5", "m6", "m7"];
            let modules: Vec<(&'static str, bool)> =
                (0..len).map(|i| (names[i], i == fail_at)).collect();
            let journal = journal();

            let err = registrar(&modules, &journal)
                .apply(&mut ServiceRegistry::new(), &Configuration::new())
                .unwrap_err();

            prop_assert_eq!(err.position(), fail_at);
            let expected: Vec<String> = names[..=fail_at].iter().map(|n| n.to_string()).collect();
            prop_assert_eq!(entries(&journal), expected);
        }
    }
}
