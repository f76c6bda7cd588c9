use rust_decimal::Decimal;

use super::common::*;
use crate::marketplace::geography::MunicipalityId;
use crate::marketplace::listings::{
    matches_search, AudienceContext, FeedParams, ListingOrdering, ListingQuery, ListingStatus,
    OrderField, SearchTerm,
};
use crate::marketplace::scope::{matches_location, FilterError};

fn query(params: FeedParams) -> ListingQuery {
    ListingQuery::from_params(params, &categories(), &hierarchy()).expect("valid params")
}

fn ids(listings: &[crate::marketplace::listings::Listing]) -> Vec<&str> {
    listings.iter().map(|listing| listing.id.0.as_str()).collect()
}

#[test]
fn inverted_price_range_fails_before_any_listing_is_read() {
    let params = FeedParams {
        min_price: Some(Decimal::from(10)),
        max_price: Some(Decimal::from(5)),
        ..FeedParams::default()
    };

    match ListingQuery::from_params(params, &categories(), &hierarchy()) {
        Err(FilterError::InvalidRange { min, max }) => {
            assert_eq!(min, Decimal::from(10));
            assert_eq!(max, Decimal::from(5));
        }
        other => panic!("expected InvalidRange, got {other:?}"),
    }
}

#[test]
fn negative_bounds_are_rejected() {
    let params = FeedParams {
        max_price: Some(Decimal::from(-1)),
        ..FeedParams::default()
    };
    match ListingQuery::from_params(params, &categories(), &hierarchy()) {
        Err(FilterError::NegativeBound(bound)) => assert_eq!(bound, Decimal::from(-1)),
        other => panic!("expected NegativeBound, got {other:?}"),
    }
}

#[test]
fn price_bounds_are_inclusive() {
    let mut cheap = listing("lst-cheap", ListingStatus::Active);
    cheap.price = Decimal::from(10);
    let mut pricey = listing("lst-pricey", ListingStatus::Active);
    pricey.price = Decimal::from(30);

    let query = query(FeedParams {
        min_price: Some(Decimal::from(10)),
        max_price: Some(Decimal::from(20)),
        ..FeedParams::default()
    });

    assert!(query.admits(&cheap, now()));
    assert!(!query.admits(&pricey, now()));
}

#[test]
fn category_filter_follows_active_descendants() {
    let mut citrus = listing("lst-citrus", ListingStatus::Active);
    citrus.category = Some(CITRUS);
    let mut tropical = listing("lst-tropical", ListingStatus::Active);
    tropical.category = Some(TROPICAL);
    let mut vegetables = listing("lst-veg", ListingStatus::Active);
    vegetables.category = Some(VEGETABLES);
    let mut uncategorised = listing("lst-none", ListingStatus::Active);
    uncategorised.category = None;

    let fruits = query(FeedParams {
        category: Some(FRUITS),
        ..FeedParams::default()
    });

    assert!(fruits.admits(&citrus, now()));
    assert!(!fruits.admits(&tropical, now()));
    assert!(!fruits.admits(&vegetables, now()));
    assert!(!fruits.admits(&uncategorised, now()));
}

#[test]
fn location_filter_is_closed_world() {
    let mut medellin = listing("lst-medellin", ListingStatus::Active);
    medellin.municipality = Some(MEDELLIN);
    let mut envigado = listing("lst-envigado", ListingStatus::Active);
    envigado.municipality = Some(ENVIGADO);
    let mut soacha = listing("lst-soacha", ListingStatus::Active);
    soacha.municipality = Some(SOACHA);
    let mut nowhere = listing("lst-nowhere", ListingStatus::Active);
    nowhere.municipality = None;

    assert!(matches_location(&envigado, Some(ANTIOQUIA), None));
    assert!(!matches_location(&soacha, Some(ANTIOQUIA), None));
    assert!(!matches_location(&nowhere, Some(ANTIOQUIA), None));
    assert!(!matches_location(&nowhere, None, Some(MunicipalityId(5001))));
    assert!(matches_location(&nowhere, None, None));

    // The municipality wins when both are given, even if they disagree.
    assert!(matches_location(&medellin, Some(CUNDINAMARCA), Some(MEDELLIN.id)));
    assert!(!matches_location(&soacha, Some(CUNDINAMARCA), Some(MEDELLIN.id)));
}

#[test]
fn search_unit_and_featured_predicates_combine() {
    let mut mango = listing("lst-mango", ListingStatus::Active);
    mango.title = "Mango Tommy".to_string();
    mango.unit_of_measure = "Kilogramos".to_string();
    mango.is_featured = true;
    let mut lemon = listing("lst-lemon", ListingStatus::Active);
    lemon.title = "Limon Tahiti".to_string();
    lemon.description = "Cosecha de mango y limon".to_string();
    lemon.unit_of_measure = "bulto".to_string();

    let search = query(FeedParams {
        search: Some("MANGO".to_string()),
        ..FeedParams::default()
    });
    assert!(search.admits(&mango, now()));
    assert!(search.admits(&lemon, now()));

    let narrowed = query(FeedParams {
        search: Some("mango".to_string()),
        unit: Some("kilo".to_string()),
        is_featured: Some(true),
        ..FeedParams::default()
    });
    assert!(narrowed.admits(&mango, now()));
    assert!(!narrowed.admits(&lemon, now()));
}

#[test]
fn feed_is_active_only_unless_asked_otherwise() {
    let listings = vec![
        listing("lst-active", ListingStatus::Active),
        listing("lst-sold", ListingStatus::Sold),
        listing("lst-pending", ListingStatus::PendingReview),
        private(listing("lst-private", ListingStatus::Active)),
    ];

    let default_feed = query(FeedParams::default()).run(
        listings.clone(),
        &AudienceContext::PublicFeed,
        now(),
    );
    assert_eq!(ids(&default_feed), vec!["lst-active"]);

    let everything = query(FeedParams {
        include_inactive: Some(true),
        ordering: Some("created_at".to_string()),
        ..FeedParams::default()
    })
    .run(listings, &AudienceContext::PublicFeed, now());
    assert_eq!(ids(&everything), vec!["lst-active", "lst-pending", "lst-sold"]);
}

#[test]
fn ordering_parses_direction_and_rejects_unknown_fields() {
    let ordering: ListingOrdering = "-price".parse().expect("known field");
    assert_eq!(ordering.field, OrderField::Price);
    assert!(ordering.descending);

    match "popularity".parse::<ListingOrdering>() {
        Err(FilterError::UnknownOrdering(raw)) => assert_eq!(raw, "popularity"),
        other => panic!("expected UnknownOrdering, got {other:?}"),
    }

    let mut cheap = listing("lst-b", ListingStatus::Active);
    cheap.price = Decimal::from(5);
    let mut dear = listing("lst-a", ListingStatus::Active);
    dear.price = Decimal::from(50);
    let sorted = query(FeedParams {
        ordering: Some("-price".to_string()),
        ..FeedParams::default()
    })
    .run(vec![cheap, dear], &AudienceContext::PublicFeed, now());
    assert_eq!(ids(&sorted), vec!["lst-a", "lst-b"]);
}

#[test]
fn feed_params_accept_q_alias() {
    let params: FeedParams =
        serde_json::from_value(serde_json::json!({ "q": "cafe", "is_featured": true }))
            .expect("params deserialize");
    assert_eq!(params.search.as_deref(), Some("cafe"));
    assert_eq!(params.is_featured, Some(true));
}

#[test]
fn search_matches_municipality_and_department_names() {
    let mut medellin = listing("lst-medellin", ListingStatus::Active);
    medellin.municipality = Some(MEDELLIN);
    let mut soacha = listing("lst-soacha", ListingStatus::Active);
    soacha.municipality = Some(SOACHA);
    let mut nowhere = listing("lst-nowhere", ListingStatus::Active);
    nowhere.municipality = None;

    let by_department = SearchTerm::new("Antioquia", &hierarchy()).expect("non-blank term");
    assert!(matches_search(&medellin, &by_department));
    assert!(!matches_search(&soacha, &by_department));
    assert!(!matches_search(&nowhere, &by_department));

    let by_municipality = query(FeedParams {
        search: Some("soach".to_string()),
        ..FeedParams::default()
    });
    assert!(by_municipality.admits(&soacha, now()));
    assert!(!by_municipality.admits(&medellin, now()));

    assert!(SearchTerm::new("   ", &hierarchy()).is_none());
}

#[test]
fn default_ordering_is_newest_published_then_newest_created() {
    let mut early = listing_created("lst-early", ListingStatus::Active, at(1, 0));
    early.published_at = Some(at(5, 0));
    let mut late = listing_created("lst-late", ListingStatus::Active, at(2, 0));
    late.published_at = Some(at(4, 0));
    let mut twin = listing_created("lst-twin", ListingStatus::Active, at(3, 0));
    twin.published_at = Some(at(4, 0));
    let unpublished = listing_created("lst-draft", ListingStatus::PendingReview, at(6, 0));

    let sorted = query(FeedParams {
        include_inactive: Some(true),
        ..FeedParams::default()
    })
    .run(
        vec![late, unpublished, early, twin],
        &AudienceContext::PublicFeed,
        now(),
    );
    assert_eq!(
        ids(&sorted),
        vec!["lst-early", "lst-twin", "lst-late", "lst-draft"]
    );
}
