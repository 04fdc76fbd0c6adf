use crate::infra::{parse_date, seed_catalog, ELDERLY_CARE, HOME_NURSING};
use carelink::config::MarketplaceConfig;
use carelink::error::AppError;
use carelink::workflows::memory::InMemoryBackend;
use carelink::workflows::providers::ApplicationSubmission;
use carelink::workflows::requests::{BookingRequest, ServiceRequest};
use carelink::workflows::settlement::PaymentOutcome;
use carelink::workflows::{
    Actor, CategoryId, Marketplace, MarketplaceError, Money, ReviewLookup, ShiftType,
};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::Args;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First service date for demo bookings (YYYY-MM-DD). Defaults to tomorrow.
    #[arg(long, value_parser = parse_date)]
    pub(crate) service_date: Option<NaiveDate>,
    /// Print the closing admin statistics as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

struct Demo {
    marketplace: Marketplace,
    backend: InMemoryBackend,
    admin: Actor,
    client: Actor,
    service_date: NaiveDate,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { service_date, json } = args;
    let service_date =
        service_date.unwrap_or_else(|| Local::now().date_naive() + chrono::Duration::days(1));

    let (marketplace, backend) = Marketplace::in_memory(&MarketplaceConfig::default());
    seed_catalog(&backend).map_err(MarketplaceError::from)?;
    let demo = Demo {
        marketplace,
        backend,
        admin: Actor::admin("admin-demo"),
        client: Actor::client("client-demo"),
        service_date,
    };

    println!("CareLink marketplace demo (service date {service_date})");

    println!("\n[D] Provider vetting unlocks bookings");
    let nurse = demo.vetted_provider("prov-nurse", "Salma Odeh", HOME_NURSING)?;
    let carer = demo.vetted_provider("prov-carer", "Khaled Nasser", ELDERLY_CARE)?;

    println!("\n[A] Booking paid end to end");
    let paid = demo.paid_booking(&nurse, HOME_NURSING, 0)?;

    println!("\n[B] Provider rejects with a reason");
    let request = demo.book(&carer, ELDERLY_CARE, ShiftType::ShortShift, 0)?;
    let rejected = demo
        .marketplace
        .requests
        .reject(&request.id, &carer, "Already committed that morning")?;
    println!(
        "- {} -> {} ({})",
        rejected.id,
        rejected.status.label(),
        rejected.rejection_reason.as_deref().unwrap_or("no reason")
    );

    println!("\n[C] Cancelled booking cannot be accepted");
    let request = demo.book(&carer, ELDERLY_CARE, ShiftType::ShortShift, 1)?;
    let cancelled = demo.marketplace.requests.cancel(&request.id, &demo.client)?;
    println!("- {} -> {}", cancelled.id, cancelled.status.label());
    match demo.marketplace.requests.accept(&request.id, &carer) {
        Ok(_) => println!("  Unexpected: accept succeeded"),
        Err(err) => println!("  Accept refused: {err}"),
    }

    println!("\n[E] Completion allows exactly one review");
    demo.marketplace.requests.start(&paid.id, &nurse)?;
    let completed = demo.marketplace.requests.complete(&paid.id, &nurse)?;
    println!("- {} -> {}", completed.id, completed.status.label());
    demo.marketplace.reviews.submit_review(
        &paid.id,
        &demo.client,
        5,
        Some("Attentive and professional".to_string()),
    )?;
    if let Err(err) = demo
        .marketplace
        .reviews
        .submit_review(&paid.id, &demo.client, 2, None)
    {
        println!("  Second review refused: {err}");
    }
    if let ReviewLookup::Reviewed(review) = demo.marketplace.reviews.fetch_review(&paid.id)? {
        println!("  Stored rating: {}/5", review.rating);
    }

    let earnings = demo.marketplace.dashboard.earnings(&nurse.id, &nurse)?;
    println!(
        "\nProvider {} earned {} over {} completed job(s)",
        earnings.provider_id, earnings.total_earnings, earnings.completed_jobs
    );

    let stats = demo.marketplace.dashboard.stats(&demo.admin)?;
    if json {
        match serde_json::to_string_pretty(&stats) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Statistics unavailable: {err}"),
        }
    } else {
        println!("Marketplace revenue: {}", stats.total_revenue);
        for entry in stats.requests_by_status.iter().filter(|entry| entry.count > 0) {
            println!("  - {}: {}", entry.status_label, entry.count);
        }
    }
    println!(
        "Events published: {} ({} operator alerts)",
        demo.backend.events.events().len(),
        demo.backend.events.operator_alerts().len()
    );

    Ok(())
}

impl Demo {
    fn vetted_provider(
        &self,
        id: &str,
        name: &str,
        category: &str,
    ) -> Result<Actor, MarketplaceError> {
        let provider = Actor::provider(id);
        let application = self.marketplace.providers.submit(
            &provider,
            ApplicationSubmission {
                display_name: name.to_string(),
                city: "Amman".to_string(),
                bio: format!("Experienced {category} professional"),
                experience_years: 5,
                category_ids: vec![CategoryId(category.to_string())],
                hourly_rate: Money::from_units(20),
                documents: Vec::new(),
            },
        )?;

        let refused = self
            .book(&provider, category, ShiftType::ShortShift, 0)
            .is_err();
        println!(
            "- {} submitted ({}); booking before approval refused: {}",
            application.id,
            application.status.label(),
            refused
        );

        let approved = self.marketplace.providers.approve(&application.id, &self.admin)?;
        println!("  {} -> {}", approved.id, approved.status.label());
        Ok(provider)
    }

    fn book(
        &self,
        provider: &Actor,
        category: &str,
        shift_type: ShiftType,
        day_offset: i64,
    ) -> Result<ServiceRequest, MarketplaceError> {
        self.marketplace.requests.create(
            &self.client,
            BookingRequest {
                provider_id: provider.id.clone(),
                category_id: CategoryId(category.to_string()),
                shift_type,
                preferred_date: self.service_date + chrono::Duration::days(day_offset * 2),
                preferred_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
                address: "21 Rainbow St, Amman".to_string(),
                description: None,
            },
        )
    }

    fn paid_booking(
        &self,
        provider: &Actor,
        category: &str,
        day_offset: i64,
    ) -> Result<ServiceRequest, MarketplaceError> {
        let request = self.book(provider, category, ShiftType::LongShift, day_offset)?;
        println!(
            "- {} created at {} -> {}",
            request.id,
            request.total_price,
            request.status.label()
        );
        let accepted = self.marketplace.requests.accept(&request.id, provider)?;
        println!("  accepted -> {}", accepted.status.label());

        let checkout = self
            .marketplace
            .settlement
            .open_checkout(&request.id, &self.client)?;
        println!("  checkout at {}", checkout.redirect_url);

        for delivery in 1..=2 {
            let resolution = self
                .marketplace
                .settlement
                .handle_callback(&checkout.external_session_id, PaymentOutcome::Succeeded)?;
            println!("  callback #{delivery}: {resolution:?}");
        }

        let paid = self.marketplace.requests.get(&request.id, &self.client)?;
        println!("  status -> {} (code {})", paid.status.label(), paid.status.code());
        Ok(paid)
    }
}
