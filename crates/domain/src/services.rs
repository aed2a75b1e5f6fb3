use std::sync::Arc;

use crate::assignments::AssignmentService;
use crate::batches::BatchService;
use crate::class_tests::ClassTestService;
use crate::clock::Clock;
use crate::fees::{FeeRecordGenerator, FeeService};
use crate::membership::BatchMembershipService;
use crate::messages::MessageService;
use crate::notes::NoteService;
use crate::notifications::{NotificationEmitter, NotificationService};
use crate::ports::store::DocumentStore;
use crate::recipients::RecipientResolver;
use crate::repository::Repositories;
use crate::students::StudentService;
use crate::teachers::TeacherService;

/// Every service wired over one store and one clock.
#[derive(Clone)]
pub struct Services {
    pub repos: Repositories,
    pub resolver: RecipientResolver,
    pub emitter: NotificationEmitter,
    pub teachers: TeacherService,
    pub students: StudentService,
    pub batches: BatchService,
    pub membership: BatchMembershipService,
    pub assignments: AssignmentService,
    pub notes: NoteService,
    pub tests: ClassTestService,
    pub messages: MessageService,
    pub fees: FeeService,
    pub fee_generator: FeeRecordGenerator,
    pub notifications: NotificationService,
}

impl Services {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        let repos = Repositories::new(store);
        let resolver = RecipientResolver::new(repos.batches.clone(), repos.students.clone());
        let emitter = NotificationEmitter::new(repos.notifications.clone(), clock.clone());
        let fees = FeeService::new(
            repos.fees.clone(),
            repos.batches.clone(),
            resolver.clone(),
            emitter.clone(),
            clock.clone(),
        );
        let fee_generator = FeeRecordGenerator::new(
            repos.batches.clone(),
            repos.fees.clone(),
            resolver.clone(),
            fees.clone(),
            clock.clone(),
        );

        Self {
            teachers: TeacherService::new(repos.teachers.clone(), clock.clone()),
            students: StudentService::new(repos.students.clone(), clock.clone()),
            batches: BatchService::new(repos.batches.clone(), clock.clone()),
            membership: BatchMembershipService::new(
                repos.students.clone(),
                repos.batches.clone(),
                resolver.clone(),
                emitter.clone(),
            ),
            assignments: AssignmentService::new(
                repos.assignments.clone(),
                resolver.clone(),
                emitter.clone(),
                clock.clone(),
            ),
            notes: NoteService::new(
                repos.notes.clone(),
                resolver.clone(),
                emitter.clone(),
                clock.clone(),
            ),
            tests: ClassTestService::new(
                repos.tests.clone(),
                repos.test_results.clone(),
                clock.clone(),
            ),
            messages: MessageService::new(
                repos.messages.clone(),
                resolver.clone(),
                emitter.clone(),
                clock.clone(),
            ),
            notifications: NotificationService::new(repos.notifications.clone(), clock),
            fees,
            fee_generator,
            resolver,
            emitter,
            repos,
        }
    }
}
