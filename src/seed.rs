// 🌱 Sample data for every app
//
// Each app is seeded only while its root table is empty, so running this
// twice is harmless. Rows go through the normal create handlers and end up in
// the audit trail like anything else.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::apps::anniversary::{
    CreateGiftCommand, CreateImportantDateCommand, CreateReminderCommand, DateType,
    DeliveryChannel, Gift, GiftStatus, ImportantDate, RecurrencePattern, Reminder,
};
use crate::apps::bills::{
    Bill, BillingFrequency, CreateBillCommand, CreatePayeeCommand, CreatePaymentCommand, Payee,
    Payment, PaymentMethod,
};
use crate::apps::blood_pressure::{CreateReadingCommand, Reading};
use crate::apps::camping::{
    CampingTrip, Campsite, CampsiteType, CreateCampingTripCommand, CreateCampsiteCommand,
    CreateGearChecklistCommand, CreateReviewCommand, GearChecklist, Review,
};
use crate::apps::fuel::{
    CreateFillUpCommand, CreateTripCommand, CreateVehicleCommand, FillUp, FuelType, Trip, TripType, Vehicle,
};
use crate::apps::real_estate::{
    CashFlow, CreateCashFlowCommand, CreateExpenseCommand, CreateLeaseCommand, CreatePropertyCommand, Expense,
    Lease, Property, PropertyType,
};
use crate::apps::wine::{
    CreateDrinkingWindowCommand, CreateTastingNoteCommand, CreateWineCommand, DrinkingWindow,
    Region, TastingNote, Wine, WineType,
};
use crate::error::AppResult;
use crate::handler::Handlers;
use crate::store::{self, Record};

/// Owner of every seeded row
pub const SAMPLE_USER_ID: Uuid = Uuid::from_u128(0x11111111_1111_1111_1111_111111111111);

/// Apps that received data on this run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub seeded: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

type SeedFn = fn(&Handlers<'_>, NaiveDate) -> AppResult<()>;

pub fn seed_all(handlers: &Handlers<'_>, today: NaiveDate) -> Result<SeedSummary> {
    let apps: [(&'static str, &'static str, SeedFn); 7] = [
        ("anniversary", ImportantDate::TABLE, seed_anniversary),
        ("bills", Payee::TABLE, seed_bills),
        ("blood_pressure", Reading::TABLE, seed_blood_pressure),
        ("fuel", Vehicle::TABLE, seed_fuel),
        ("wine", Wine::TABLE, seed_wine),
        ("real_estate", Property::TABLE, seed_real_estate),
        ("camping", Campsite::TABLE, seed_camping),
    ];

    let mut summary = SeedSummary::default();
    for (app, table, seed) in apps {
        if table_has_rows(handlers, table)? {
            info!(app, "Database already contains data, skipping seed");
            summary.skipped.push(app);
            continue;
        }

        info!(app, "Seeding initial data");
        seed(handlers, today).with_context(|| format!("Failed to seed {}", app))?;
        summary.seeded.push(app);
    }

    Ok(summary)
}

fn table_has_rows(handlers: &Handlers<'_>, table: &str) -> Result<bool> {
    let count: i64 = handlers
        .conn
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .with_context(|| format!("Failed to count {}", table))?;
    Ok(count > 0)
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn money(units: i64, cents: u32) -> Decimal {
    Decimal::new(units * 100 + cents as i64, 2)
}

// ============================================================================
// ANNIVERSARY
// ============================================================================

fn seed_anniversary(h: &Handlers<'_>, today: NaiveDate) -> AppResult<()> {
    let dates = [
        ("John Smith", DateType::Birthday, ymd(1985, 6, 15), "Friend", "Likes technology gadgets"),
        ("Jane Doe", DateType::Birthday, ymd(1990, 3, 22), "Family", "Loves books and gardening"),
        ("Wedding Anniversary", DateType::Anniversary, ymd(2015, 9, 10), "Spouse", "10th anniversary coming up!"),
        ("Mom", DateType::Birthday, ymd(1960, 12, 5), "Family", "Prefers experiences over gifts"),
        ("Company Anniversary", DateType::Custom, ymd(2020, 1, 15), "Work", "Celebrate work anniversary"),
    ];

    let mut created = Vec::new();
    for (name, date_type, date_value, relationship, notes) in dates {
        created.push(h.create::<ImportantDate>(CreateImportantDateCommand {
            user_id: SAMPLE_USER_ID,
            person_name: name.to_string(),
            date_type,
            date_value,
            recurrence_pattern: RecurrencePattern::Annual,
            relationship: Some(relationship.to_string()),
            notes: Some(notes.to_string()),
        })?);
    }

    let john = &created[0];
    let next = store::find::<ImportantDate>(h.conn, john.important_date_id)?
        .and_then(|d| d.next_occurrence(today))
        .unwrap_or(today);
    let week_before = next - Duration::days(7);
    h.create::<Reminder>(CreateReminderCommand {
        important_date_id: john.important_date_id,
        scheduled_time: Utc.from_utc_datetime(&week_before.and_hms_opt(9, 0, 0).unwrap_or_default()),
        advance_notice_days: 7,
        delivery_channel: DeliveryChannel::Email,
    })?;
    h.create::<Gift>(CreateGiftCommand {
        important_date_id: john.important_date_id,
        description: "Noise-cancelling headphones".to_string(),
        estimated_price: money(249, 99),
        purchase_url: None,
        status: GiftStatus::Idea,
    })?;

    Ok(())
}

// ============================================================================
// BILLS
// ============================================================================

fn seed_bills(h: &Handlers<'_>, today: NaiveDate) -> AppResult<()> {
    let power = h.create::<Payee>(CreatePayeeCommand {
        user_id: SAMPLE_USER_ID,
        name: "City Power & Light".to_string(),
        category: Some("Utilities".to_string()),
        account_number: Some("CPL-448812".to_string()),
        website: Some("https://example.com/power".to_string()),
        phone: None,
        notes: None,
    })?;
    let isp = h.create::<Payee>(CreatePayeeCommand {
        user_id: SAMPLE_USER_ID,
        name: "FiberNet".to_string(),
        category: Some("Internet".to_string()),
        account_number: None,
        website: None,
        phone: Some("555-0100".to_string()),
        notes: None,
    })?;

    let electric = h.create::<Bill>(CreateBillCommand {
        user_id: SAMPLE_USER_ID,
        payee_id: power.payee_id,
        name: "Electric".to_string(),
        amount: money(98, 40),
        due_date: today - Duration::days(20),
        billing_frequency: BillingFrequency::Monthly,
        is_autopay: false,
        notes: None,
    })?;
    h.create::<Bill>(CreateBillCommand {
        user_id: SAMPLE_USER_ID,
        payee_id: isp.payee_id,
        name: "Internet".to_string(),
        amount: money(65, 0),
        due_date: today + Duration::days(10),
        billing_frequency: BillingFrequency::Monthly,
        is_autopay: true,
        notes: None,
    })?;
    h.create::<Payment>(CreatePaymentCommand {
        bill_id: electric.bill_id,
        amount: money(98, 40),
        payment_date: today - Duration::days(21),
        payment_method: PaymentMethod::BankTransfer,
        confirmation_number: Some("CONF-20931".to_string()),
        notes: None,
    })?;

    Ok(())
}

// ============================================================================
// BLOOD PRESSURE
// ============================================================================

fn seed_blood_pressure(h: &Handlers<'_>, today: NaiveDate) -> AppResult<()> {
    let readings = [(142, 91, 78), (138, 88, 74), (135, 86, 72), (129, 82, 70), (124, 79, 68)];
    let start = today - Duration::days(readings.len() as i64);

    for (i, (systolic, diastolic, pulse)) in readings.into_iter().enumerate() {
        let day = start + Duration::days(i as i64);
        h.create::<Reading>(CreateReadingCommand {
            user_id: SAMPLE_USER_ID,
            systolic,
            diastolic,
            pulse: Some(pulse),
            measured_at: Utc.from_utc_datetime(&day.and_hms_opt(7, 30, 0).unwrap_or_default()),
            position: Some("Sitting".to_string()),
            arm: Some("Left".to_string()),
            notes: None,
        })?;
    }

    Ok(())
}

// ============================================================================
// FUEL
// ============================================================================

fn seed_fuel(h: &Handlers<'_>, today: NaiveDate) -> AppResult<()> {
    let camry = h.create::<Vehicle>(CreateVehicleCommand {
        user_id: SAMPLE_USER_ID,
        make: "Toyota".to_string(),
        model: "Camry".to_string(),
        year: 2020,
        vin: Some("1HGBH41JXMN109186".to_string()),
        license_plate: Some("ABC1234".to_string()),
        fuel_type: FuelType::Gasoline,
        tank_capacity: Some(Decimal::new(158, 1)),
        epa_city_mpg: None,
        epa_highway_mpg: None,
    })?;
    h.create::<Vehicle>(CreateVehicleCommand {
        user_id: SAMPLE_USER_ID,
        make: "Honda".to_string(),
        model: "Civic".to_string(),
        year: 2019,
        vin: None,
        license_plate: None,
        fuel_type: FuelType::Gasoline,
        tank_capacity: Some(Decimal::new(124, 1)),
        epa_city_mpg: None,
        epa_highway_mpg: None,
    })?;

    let fill_ups = [
        (30, 25000, Decimal::new(125, 1), money(3, 45), "Gas Station A", Some("Regular unleaded")),
        (23, 25350, Decimal::new(112, 1), money(3, 52), "Gas Station B", None),
        (16, 25720, Decimal::new(128, 1), money(3, 38), "Gas Station A", None),
    ];
    for (days_ago, odometer, gallons, price, station, notes) in fill_ups {
        h.create::<FillUp>(CreateFillUpCommand {
            vehicle_id: camry.vehicle_id,
            fill_up_date: today - Duration::days(days_ago),
            odometer: Decimal::from(odometer),
            gallons,
            price_per_gallon: price,
            is_full_tank: true,
            fuel_grade: Some("Regular".to_string()),
            gas_station: Some(station.to_string()),
            notes: notes.map(str::to_string),
        })?;
    }

    let trips = [
        (
            20,
            18,
            25350,
            25720,
            TripType::Business,
            "Client meeting in another city",
            Some("Highway driving, good weather"),
        ),
        (10, 9, 25720, 25850, TripType::Personal, "Weekend getaway", None),
    ];
    for (start_ago, end_ago, start, end, trip_type, purpose, notes) in trips {
        h.create::<Trip>(CreateTripCommand {
            vehicle_id: camry.vehicle_id,
            user_id: SAMPLE_USER_ID,
            start_date: today - Duration::days(start_ago),
            end_date: Some(today - Duration::days(end_ago)),
            start_odometer: Decimal::from(start),
            end_odometer: Some(Decimal::from(end)),
            trip_type,
            purpose: Some(purpose.to_string()),
            start_location: None,
            end_location: None,
            notes: notes.map(str::to_string),
        })?;
    }

    Ok(())
}

// ============================================================================
// WINE
// ============================================================================

fn seed_wine(h: &Handlers<'_>, _today: NaiveDate) -> AppResult<()> {
    let margaux = h.create::<Wine>(CreateWineCommand {
        user_id: SAMPLE_USER_ID,
        name: "Château Margaux".to_string(),
        wine_type: WineType::Red,
        region: Region::Bordeaux,
        vintage: Some(2015),
        producer: Some("Château Margaux".to_string()),
        purchase_price: Some(money(450, 0)),
        bottle_count: 3,
        storage_location: Some("Rack A, Row 2".to_string()),
        notes: None,
    })?;
    h.create::<Wine>(CreateWineCommand {
        user_id: SAMPLE_USER_ID,
        name: "Riesling Kabinett".to_string(),
        wine_type: WineType::White,
        region: Region::Mosel,
        vintage: Some(2021),
        producer: Some("Dr. Loosen".to_string()),
        purchase_price: Some(money(24, 99)),
        bottle_count: 6,
        storage_location: Some("Fridge".to_string()),
        notes: None,
    })?;

    h.create::<TastingNote>(CreateTastingNoteCommand {
        user_id: SAMPLE_USER_ID,
        wine_id: margaux.wine_id,
        tasting_date: None,
        rating: 96,
        appearance: Some("Deep garnet".to_string()),
        aroma: Some("Cassis, violet, cedar".to_string()),
        taste: Some("Silky tannins, layered fruit".to_string()),
        finish: Some("Very long".to_string()),
        overall_impression: Some("Needs more time".to_string()),
    })?;
    h.create::<DrinkingWindow>(CreateDrinkingWindowCommand {
        user_id: SAMPLE_USER_ID,
        wine_id: margaux.wine_id,
        start_date: ymd(2025, 1, 1),
        end_date: ymd(2045, 12, 31),
        notes: None,
    })?;

    Ok(())
}

// ============================================================================
// REAL ESTATE
// ============================================================================

fn seed_real_estate(h: &Handlers<'_>, today: NaiveDate) -> AppResult<()> {
    let properties = [
        (
            "123 Main Street, Springfield, IL 62701",
            PropertyType::SingleFamily,
            250_000,
            ymd(2020, 3, 15),
            320_000,
            (2000, 3, 2),
            "Great neighborhood, near schools",
        ),
        (
            "456 Oak Avenue, Apt 101, Chicago, IL 60601",
            PropertyType::Condo,
            180_000,
            ymd(2021, 6, 1),
            195_000,
            (1200, 2, 2),
            "Downtown location, HOA $300/month",
        ),
        (
            "789 Elm Street, Units 1-4, Peoria, IL 61602",
            PropertyType::MultiFamily,
            450_000,
            ymd(2019, 9, 20),
            520_000,
            (4800, 12, 8),
            "4-unit apartment building, all units occupied",
        ),
    ];

    let mut created = Vec::new();
    for (address, property_type, purchase, purchase_date, current, (square_feet, bedrooms, bathrooms), notes) in
        properties
    {
        created.push(h.create::<Property>(CreatePropertyCommand {
            user_id: SAMPLE_USER_ID,
            address: address.to_string(),
            property_type,
            purchase_price: money(purchase, 0),
            purchase_date,
            current_value: money(current, 0),
            square_feet,
            bedrooms,
            bathrooms,
            notes: Some(notes.to_string()),
        })?);
    }

    let expenses = [
        (0, "Property tax", money(4200, 0), "Taxes", true),
        (0, "Water heater replacement", money(1350, 0), "Repairs", false),
        (1, "HOA dues", money(300, 0), "HOA", true),
        (2, "Roof repair", money(8000, 0), "Repairs", false),
    ];
    for (property, description, amount, category, is_recurring) in expenses {
        h.create::<Expense>(CreateExpenseCommand {
            property_id: created[property].property_id,
            description: description.to_string(),
            amount,
            date: today - Duration::days(60),
            category: category.to_string(),
            is_recurring,
            notes: None,
        })?;
    }

    let leases = [
        (
            0,
            "John and Sarah Smith",
            1800,
            ymd(2023, 1, 1),
            ymd(2024, 12, 31),
            3600,
            "Great tenants, always pay on time",
        ),
        (
            1,
            "Emily Rodriguez",
            1400,
            ymd(2023, 7, 1),
            ymd(2024, 6, 30),
            2800,
            "Young professional, clean tenant",
        ),
        (2, "Unit 1 - Michael Chen", 1100, ymd(2022, 5, 1), ymd(2024, 4, 30), 2200, "Long-term tenant"),
        (2, "Unit 2 - David Park", 1100, ymd(2023, 3, 1), ymd(2024, 2, 28), 2200, "Quiet tenant"),
    ];
    for (property, tenant, rent, start_date, end_date, deposit, notes) in leases {
        h.create::<Lease>(CreateLeaseCommand {
            property_id: created[property].property_id,
            tenant_name: tenant.to_string(),
            monthly_rent: money(rent, 0),
            start_date,
            end_date,
            security_deposit: money(deposit, 0),
            is_active: true,
            notes: Some(notes.to_string()),
        })?;
    }

    let cash_flows = [
        (0, 1800, 500, "Rent collected, insurance and maintenance"),
        (1, 1400, 450, "Rent collected, HOA and utilities"),
        (2, 4400, 1500, "All units rented, maintenance and landscaping"),
    ];
    for (property, income, expenses, notes) in cash_flows {
        h.create::<CashFlow>(CreateCashFlowCommand {
            property_id: created[property].property_id,
            date: ymd(2024, 6, 1),
            income: money(income, 0),
            expenses: money(expenses, 0),
            notes: Some(notes.to_string()),
        })?;
    }

    Ok(())
}

// ============================================================================
// CAMPING
// ============================================================================

fn seed_camping(h: &Handlers<'_>, today: NaiveDate) -> AppResult<()> {
    let campsites = [
        (
            "Mountain View Campground",
            "Rocky Mountain National Park, Colorado",
            CampsiteType::Tent,
            "Beautiful mountain views with hiking trails nearby",
            (false, true),
            Some(money(25, 0)),
            true,
        ),
        (
            "Lakeside RV Park",
            "Lake Tahoe, California",
            CampsiteType::Rv,
            "Full hookup sites with lake access",
            (true, true),
            Some(money(45, 0)),
            false,
        ),
        (
            "Pine Forest Primitive Site",
            "Olympic National Forest, Washington",
            CampsiteType::Primitive,
            "Remote backcountry camping experience",
            (false, false),
            None,
            true,
        ),
    ];

    let mut sites = Vec::new();
    for (name, location, campsite_type, description, (has_electricity, has_water), cost_per_night, is_favorite) in
        campsites
    {
        sites.push(h.create::<Campsite>(CreateCampsiteCommand {
            user_id: SAMPLE_USER_ID,
            name: name.to_string(),
            location: Some(location.to_string()),
            campsite_type,
            description: Some(description.to_string()),
            has_electricity,
            has_water,
            cost_per_night,
            is_favorite,
        })?);
    }

    let trips = [
        (0, "Summer Mountain Adventure", 60, 3, 4, "Bring extra warm clothing for night time"),
        (1, "Weekend Lake Getaway", 30, 2, 2, "Don't forget fishing gear"),
    ];
    let mut planned = Vec::new();
    for (site, name, days_ahead, nights, people, notes) in trips {
        let start_date = today + Duration::days(days_ahead);
        planned.push(h.create::<CampingTrip>(CreateCampingTripCommand {
            user_id: SAMPLE_USER_ID,
            campsite_id: sites[site].campsite_id,
            name: name.to_string(),
            start_date,
            end_date: start_date + Duration::days(nights),
            number_of_people: people,
            notes: Some(notes.to_string()),
        })?);
    }

    let gear = [
        ("Tent", false, 1, Some("4-person tent")),
        ("Sleeping Bags", true, 4, None),
        ("Camping Stove", false, 1, Some("Check propane level")),
    ];
    for (item_name, is_packed, quantity, notes) in gear {
        h.create::<GearChecklist>(CreateGearChecklistCommand {
            user_id: SAMPLE_USER_ID,
            trip_id: planned[0].trip_id,
            item_name: item_name.to_string(),
            is_packed,
            quantity,
            notes: notes.map(str::to_string),
        })?;
    }

    let reviews = [
        (0, 5, "Amazing views and well-maintained facilities. Perfect for families!", 30),
        (2, 4, "Great backcountry experience, but prepare for no amenities.", 15),
    ];
    for (site, rating, text, days_ago) in reviews {
        h.create::<Review>(CreateReviewCommand {
            user_id: SAMPLE_USER_ID,
            campsite_id: sites[site].campsite_id,
            rating,
            review_text: Some(text.to_string()),
            review_date: today - Duration::days(days_ago),
        })?;
    }

    Ok(())
}
