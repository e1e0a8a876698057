//! Print TypeScript declarations for the admin UI.

use db::models::{
    flock::{Flock, FlockDependents},
    reminder::{Reminder, ReminderPriority, ReminderStatus},
    reminder_template::{BundleCategory, BundleConfig, BundleReminder, ReminderTemplate},
};
use server::routes::{
    flocks::{GenerateRemindersRequest, ReschedulePlacementRequest},
    maintenance::RepairTitlesRequest,
    reminder_templates::AddCategoryRequest,
    reminders::UpdateReminderStatus,
};
use services::services::{
    batch::{BatchFailure, BatchSummary},
    bundle_provisioning::ProvisionResult,
    flock_lifecycle::{OrphanPurge, RescheduleResult},
    reminder_generation::GenerationSummary,
    reminder_resolver::{InsertPosition, ReminderInstance},
};
use ts_rs::TS;

fn main() {
    let decls = [
        Flock::decl(),
        FlockDependents::decl(),
        Reminder::decl(),
        ReminderStatus::decl(),
        ReminderPriority::decl(),
        ReminderTemplate::decl(),
        BundleConfig::decl(),
        BundleCategory::decl(),
        BundleReminder::decl(),
        ReminderInstance::decl(),
        InsertPosition::decl(),
        GenerationSummary::decl(),
        ProvisionResult::decl(),
        RescheduleResult::decl(),
        OrphanPurge::decl(),
        BatchSummary::decl(),
        BatchFailure::decl(),
        GenerateRemindersRequest::decl(),
        ReschedulePlacementRequest::decl(),
        AddCategoryRequest::decl(),
        UpdateReminderStatus::decl(),
        RepairTitlesRequest::decl(),
    ];

    println!("// This file was generated by `cargo run --bin generate_types`. Do not edit.\n");
    for decl in decls {
        println!("export {decl}\n");
    }
}
