use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use souk::error::AppError;
use souk::listings::{
    seed, Actor, CreatorView, ListingDraft, ListingHub, ListingPatch, ListingRecord, ResourceKind,
    Role, SeekerTab, SessionSettings, ViewSelector,
};

use crate::infra::InMemoryListingDirectory;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Seed the in-memory directory from a listings CSV export before the
    /// scripted walkthrough runs.
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
    /// Skip the service-catalogue rejection/resubmission portion of the demo.
    #[arg(long)]
    pub(crate) skip_services: bool,
}

fn render_listing(record: &ListingRecord) {
    let location = record.location.as_deref().unwrap_or("unspecified");
    println!(
        "  - [{}] {} ({}) by {} @ {}",
        record.status.label(),
        record.title,
        record.id,
        record.owner_id,
        location
    );
    if let Some(reason) = &record.rejection_reason {
        println!("      rejection reason: {reason}");
    }
}

fn render_snapshot(heading: &str, records: &[ListingRecord]) {
    println!("{heading}");
    if records.is_empty() {
        println!("  (no listings visible)");
    }
    for record in records {
        render_listing(record);
    }
}

fn property_draft() -> ListingDraft {
    ListingDraft {
        title: "Sunny two-bedroom near the medina".to_string(),
        description: Some("Furnished, second floor, long-term lease".to_string()),
        location: Some("Marrakesh".to_string()),
        category: Some("apartment".to_string()),
        price: Some(5200),
        images: Vec::new(),
        attributes: BTreeMap::new(),
    }
}

fn service_draft() -> ListingDraft {
    ListingDraft {
        title: "Residential electrical work".to_string(),
        description: Some("Installations and repairs".to_string()),
        location: Some("Rabat".to_string()),
        category: Some("electrician".to_string()),
        price: Some(300),
        images: Vec::new(),
        attributes: BTreeMap::new(),
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        seed: seed_path,
        skip_services,
    } = args;

    let directory = match seed_path {
        Some(path) => {
            let records = seed::records_from_path(&path)?;
            println!(
                "Seeded {} listings from {}",
                records.len(),
                path.display()
            );
            Arc::new(InMemoryListingDirectory::seeded(records))
        }
        None => Arc::new(InMemoryListingDirectory::default()),
    };
    let hub = Arc::new(ListingHub::new(
        directory,
        SessionSettings::default(),
        None,
    ));

    let landlord = Actor::new("demo-landlord", Role::Landlord);
    let moderator = Actor::new("demo-moderator", Role::Moderator);
    let seeker = Actor::new("demo-seeker", Role::Seeker);

    println!("Listing moderation demo");

    // A landlord submits a property and sees it in their own list.
    let landlord_session = hub.session(&landlord, ResourceKind::Property).await;
    let submitted = landlord_session.create(property_draft()).await?;
    landlord_session.open(None).await?;
    render_snapshot("\nLandlord's own listings:", &landlord_session.snapshot());

    // The moderator's default view is the pending queue.
    let moderation = hub.session(&moderator, ResourceKind::Property).await;
    moderation.open(None).await?;
    render_snapshot("\nModeration queue:", &moderation.snapshot());

    let approved = moderation.approve(&submitted.id).await?;
    println!(
        "\nModerator approved {} -> {}",
        approved.id,
        approved.status.label()
    );

    // A seeker browsing active listings can now find and save it.
    let seeker_session = hub.session(&seeker, ResourceKind::Property).await;
    seeker_session
        .open(Some(ViewSelector::Tab(SeekerTab::Active)))
        .await?;
    render_snapshot("\nSeeker's active tab:", &seeker_session.visible());
    let saved = seeker_session.toggle_saved(&approved.id).await?;
    println!("Seeker saved {}: {saved}", approved.id);

    // The landlord's list still shows the pending submission; refresh picks
    // up the approval before the publish toggles.
    landlord_session.refresh().await?;
    let suspended = landlord_session.unpublish(&approved.id).await?;
    println!(
        "\nLandlord unpublished {} -> {}",
        suspended.id,
        suspended.status.label()
    );
    let republished = landlord_session.republish(&suspended.id).await?;
    println!(
        "Landlord republished {} -> {}",
        republished.id,
        republished.status.label()
    );

    if skip_services {
        return Ok(());
    }

    // The service catalogue runs the same workflow, here through a rejection
    // and an edit that resubmits for review.
    println!("\nService catalogue: rejection and resubmission");
    let provider = Actor::new("demo-provider", Role::Provider);
    let provider_session = hub.session(&provider, ResourceKind::Service).await;
    let service = provider_session.create(service_draft()).await?;

    let service_moderation = hub.session(&moderator, ResourceKind::Service).await;
    let rejected = service_moderation
        .reject(&service.id, "Licence number missing from the description")
        .await?;
    render_listing(&rejected);

    let resubmitted = provider_session
        .update(
            &service.id,
            ListingPatch {
                description: Some("Installations and repairs. Licence ONEE-4471".to_string()),
                ..ListingPatch::default()
            },
        )
        .await?;
    println!(
        "Provider edited {} -> {} (back in review)",
        resubmitted.id,
        resubmitted.status.label()
    );

    let final_state = service_moderation.approve(&service.id).await?;
    println!(
        "Moderator approved {} -> {}",
        final_state.id,
        final_state.status.label()
    );

    service_moderation
        .open(Some(ViewSelector::View(CreatorView::All)))
        .await?;
    render_snapshot(
        "\nModerator's full service catalogue:",
        &service_moderation.snapshot(),
    );

    Ok(())
}
