use crate::infra::{
    default_categories, load_hierarchy, InMemoryAlertRepository, InMemoryListingRepository,
};
use agromarket::config::{AppConfig, MarketplaceConfig};
use agromarket::error::AppError;
use agromarket::marketplace::alerts::{
    AlertCategoryId, AlertDraft, AlertQuery, AlertService, ScopeKind,
};
use agromarket::marketplace::categories::CategoryId;
use agromarket::marketplace::geography::{AdministrativeHierarchy, DepartmentId, MunicipalityId};
use agromarket::marketplace::listings::{
    Actor, DashboardFilter, FeedParams, ListingDraft, ListingId, ListingService, ListingStatus,
    ReviewNotesPolicy, TransitionRequest, UserId, Visibility,
};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use rust_decimal::Decimal;
use std::fmt::Display;
use std::sync::Arc;

const DEMO_OWNER: UserId = UserId(101);
const DEMO_MODERATOR: UserId = UserId(1);

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference time for the walk-through (RFC 3339). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Refuse rejections without review notes instead of warning.
    #[arg(long)]
    pub(crate) require_review_notes: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SweepArgs {
    /// Time the demo listings are created at (RFC 3339). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// How many days after creation the sweep runs.
    #[arg(long, default_value_t = 3)]
    pub(crate) after_days: i64,
}

type DemoListingService = ListingService<InMemoryListingRepository>;

fn listing_service(
    config: &MarketplaceConfig,
    hierarchy: Arc<AdministrativeHierarchy>,
) -> DemoListingService {
    ListingService::new(
        Arc::new(InMemoryListingRepository::default()),
        config,
        default_categories(),
        hierarchy,
    )
}

fn report<T, E: Display>(label: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            println!("  {label}: {err}");
            None
        }
    }
}

fn demo_draft(
    title: &str,
    price: i64,
    category: u32,
    municipality: u32,
    expires_at: Option<DateTime<Utc>>,
) -> ListingDraft {
    ListingDraft {
        title: title.to_string(),
        description: format!("{title}, cosecha de temporada"),
        category: Some(CategoryId(category)),
        price: Decimal::from(price),
        quantity: Decimal::from(250),
        unit_of_measure: "kg".to_string(),
        images: Vec::new(),
        municipality: Some(MunicipalityId(municipality)),
        visibility: Visibility::Public,
        expires_at,
    }
}

/// Create and approve the demo catalogue. Returns the ids in creation order.
fn seed_catalogue(service: &DemoListingService, now: DateTime<Utc>) -> Vec<ListingId> {
    let drafts = [
        demo_draft("Naranja tangelo", 1_900, 2, 5001, Some(now + Duration::days(1))),
        demo_draft("Mango Tommy", 3_200, 3, 73001, Some(now + Duration::days(10))),
        demo_draft("Papa pastusa", 1_100, 5, 15759, Some(now + Duration::days(2))),
        demo_draft("Cafe pergamino", 14_500, 7, 5615, None),
    ];
    let approve = TransitionRequest::new(ListingStatus::Active, Actor::Moderator(DEMO_MODERATOR));

    let mut ids = Vec::new();
    for (offset, draft) in drafts.into_iter().enumerate() {
        let created_at = now + Duration::minutes(offset as i64);
        let created = service.create(DEMO_OWNER, draft, created_at);
        let Some(listing) = report("Listing rejected", created) else {
            continue;
        };
        if report(
            "Approval failed",
            service.apply_transition(&listing.id, &approve, created_at),
        )
        .is_some()
        {
            ids.push(listing.id);
        }
    }
    ids
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        now,
        require_review_notes,
    } = args;
    let now = now.unwrap_or_else(Utc::now);

    let mut config = AppConfig::load()?.marketplace;
    if require_review_notes {
        config.review_notes = ReviewNotesPolicy::Require;
    }

    let hierarchy = Arc::new(load_hierarchy(&config)?);
    let service = listing_service(&config, hierarchy.clone());
    println!("Agricultural marketplace demo");
    println!(
        "- Review notes policy: {}",
        service.engine().review_notes_policy()
    );

    let ids = seed_catalogue(&service, now);
    println!("- Seeded and approved {} listings", ids.len());

    let moderator = Actor::Moderator(DEMO_MODERATOR);
    let owner = Actor::Owner(DEMO_OWNER);

    println!("\nModeration");
    let pending = report(
        "Submission failed",
        service.create(
            DEMO_OWNER,
            demo_draft("Tomate chonto", 2_400, 4, 25754, None),
            now,
        ),
    );
    if let Some(pending) = pending {
        let reject = TransitionRequest::new(ListingStatus::Rejected, moderator);
        if let Some(outcome) = report(
            "Rejection failed",
            service.apply_transition(&pending.id, &reject, now),
        ) {
            println!(
                "- {} rejected ({} warning(s))",
                pending.id,
                outcome.warnings.len()
            );
            for warning in &outcome.warnings {
                println!("    - {}", warning.message());
            }
        }

        let republish = TransitionRequest::new(ListingStatus::Active, owner);
        if report(
            "Owner republish refused",
            service.apply_transition(&pending.id, &republish, now),
        )
        .is_some()
        {
            println!("- Owner republished {} (unexpected)", pending.id);
        }
    }

    println!("\nOwner actions");
    if let Some(first) = ids.first() {
        let sold = TransitionRequest::new(ListingStatus::Sold, owner);
        if let Some(outcome) = report(
            "Sale failed",
            service.apply_transition(first, &sold, now + Duration::hours(1)),
        ) {
            println!("- {} {} -> {}", first, outcome.previous, outcome.listing.status());
        }

        let reactivate = TransitionRequest::new(ListingStatus::Active, moderator);
        if let Some(outcome) = report(
            "Reactivation failed",
            service.apply_transition(first, &reactivate, now + Duration::hours(2)),
        ) {
            if let Some(expiry) = outcome.listing.expires_at() {
                println!("- {} reactivated until {}", first, expiry.to_rfc3339());
            }
        }
    }

    println!("\nMarketplace feed");
    let antioquia = FeedParams {
        department: Some(DepartmentId(5)),
        ordering: Some("-price".to_string()),
        ..FeedParams::default()
    };
    if let Some(listings) = report("Feed failed", service.feed(antioquia, now)) {
        println!("- Antioquia, most expensive first:");
        let summaries: Vec<_> = listings.iter().map(|listing| listing.summary()).collect();
        match serde_json::to_string_pretty(&summaries) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("  Feed payload unavailable: {err}"),
        }
    }

    let inverted = FeedParams {
        min_price: Some(Decimal::from(10)),
        max_price: Some(Decimal::from(5)),
        ..FeedParams::default()
    };
    report("Inverted price range", service.feed(inverted, now));

    if let Some(dashboard) = report(
        "Dashboard failed",
        service.dashboard(DEMO_OWNER, DashboardFilter::default()),
    ) {
        println!(
            "- Owner dashboard: {} available / {} sold",
            dashboard.available.len(),
            dashboard.sold.len()
        );
    }

    println!("\nAlerts");
    let alerts = AlertService::new(
        Arc::new(InMemoryAlertRepository::default()),
        hierarchy,
    );
    let frost = AlertDraft {
        title: "Riesgo de helada".to_string(),
        message: "Cubra los cultivos de papa esta noche".to_string(),
        category: AlertCategoryId(1),
        scope: ScopeKind::Departmental,
        department: Some(DepartmentId(15)),
        images: Vec::new(),
    };
    report("Alert refused", alerts.publish(moderator, frost, now));
    let everything = AlertQuery::default();
    for municipality in [Some(MunicipalityId(15001)), Some(MunicipalityId(5001)), None] {
        if let Some(feed) = report("Alert feed failed", alerts.feed(municipality, &everything)) {
            let label = municipality
                .map(|id| id.0.to_string())
                .unwrap_or_else(|| "no location".to_string());
            println!(
                "- Viewer in {label}: {} alert(s){}",
                feed.alerts.len(),
                if feed.has_location { "" } else { " (profile incomplete)" }
            );
        }
    }

    Ok(())
}

pub(crate) fn run_sweep(args: SweepArgs) -> Result<(), AppError> {
    let SweepArgs { now, after_days } = args;
    let now = now.unwrap_or_else(Utc::now);
    let config = AppConfig::load()?.marketplace;

    let service = listing_service(&config, Arc::new(load_hierarchy(&config)?));
    let ids = seed_catalogue(&service, now);
    let sweep_at = now + Duration::days(after_days);
    println!(
        "Expiry sweep over {} demo listings at {}",
        ids.len(),
        sweep_at.to_rfc3339()
    );

    if let Some(result) = report("Sweep failed", service.sweep_expired(sweep_at)) {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("  Sweep report unavailable: {err}"),
        }
    }

    Ok(())
}
