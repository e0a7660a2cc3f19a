use std::sync::Arc;

use apprentice_portal::{
    auth::AuthService,
    domain::{
        AudienceRule, CreateAnnouncementRequest, CreateUserRequest, Priority,
        UpsertStudentProfileRequest, UserRole, LOCATION_TAGS, PROGRAM_STAGES,
    },
    service::ServiceContext,
};
use clap::Parser;
use fake::{
    faker::{
        address::en::CityName,
        name::en::{FirstName, LastName},
        phone_number::en::PhoneNumber,
    },
    Fake,
};
use sqlx::sqlite::SqlitePoolOptions;

const STATES: &[&str] = &["AZ", "IL", "CA", "NY", "NJ", "PA", "DC", "FL", "TX"];

#[derive(Debug, Parser)]
#[command(about = "Seed the apprentice portal database with demo data")]
struct Args {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://apprentice-portal.db?mode=rwc")]
    database_url: String,

    /// Number of student accounts to create
    #[arg(long, default_value_t = 24)]
    students: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    println!("🌱 Seeding {}", args.database_url);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let auth_service = Arc::new(AuthService::new(db_pool.clone(), 24, false));
    let ctx = ServiceContext::new(auth_service, None, db_pool);

    println!("👥 Creating accounts...");
    let admin = ctx.user_repo.create(CreateUserRequest {
        email: "admin@apprentice.local".to_string(),
        username: "admin".to_string(),
        password: "admin12345".to_string(),
        role: UserRole::Admin,
    }).await?;
    println!("  ✅ Created admin user (admin@apprentice.local / admin12345)");

    for i in 0..args.students {
        let first_name: String = FirstName().fake();
        let last_name: String = LastName().fake();
        let username = format!("{}{}", first_name.to_lowercase(), i);

        let student = ctx.user_repo.create(CreateUserRequest {
            email: format!("{}@example.com", username),
            username,
            password: "password123".to_string(),
            role: UserRole::Student,
        }).await?;

        // Every fifth student never fills in a profile.
        if i % 5 == 4 {
            continue;
        }

        ctx.student_directory.upsert_profile(student.id, UpsertStudentProfileRequest {
            first_name,
            last_name,
            preferred_name: None,
            phone: Some(PhoneNumber().fake()),
            contact_email: None,
            city: Some(CityName().fake()),
            state: Some(STATES[i % STATES.len()].to_string()),
            location_tag: Some(LOCATION_TAGS[i % LOCATION_TAGS.len()].to_string()),
        }).await?;

        ctx.student_directory
            .set_program_stage(student.id, PROGRAM_STAGES[i % PROGRAM_STAGES.len()])
            .await?;
    }
    println!("  ✅ Created {} students", args.students);

    println!("📢 Creating announcements...");
    let announcements = [
        ("Welcome to the portal", Priority::Medium, AudienceRule::all()),
        ("Apprentice orientation", Priority::High, AudienceRule::bucket(PROGRAM_STAGES[2])),
        ("New York kitchen tour", Priority::Low, AudienceRule::location("NY")),
        (
            "Explorer workshop",
            Priority::Medium,
            AudienceRule::program_stages([PROGRAM_STAGES[0], PROGRAM_STAGES[1]]),
        ),
        (
            "Chicago mixer",
            Priority::Medium,
            AudienceRule::locations([LOCATION_TAGS[1]]),
        ),
        (
            "Graduates and Los Angeles students",
            Priority::High,
            AudienceRule::both([PROGRAM_STAGES[3], PROGRAM_STAGES[4]], [LOCATION_TAGS[2]]),
        ),
    ];

    for (title, priority, audience) in announcements {
        let mode = audience.mode;
        ctx.announcement_service.create(&admin, CreateAnnouncementRequest {
            title: title.to_string(),
            content: format!("{} details will follow.", title),
            priority,
            category: None,
            audience,
            notify_students: false,
            include_admins: false,
        }).await?;
        println!("  ✅ {} ({})", title, mode.as_str());
    }

    println!("🎉 Seeding complete");
    Ok(())
}
