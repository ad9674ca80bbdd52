//! Seed reference data.
//!
//! `seed tiers` installs the default loyalty ladder into `niveles_cuenta`.
//! Existing tiers with the same code are updated in place, so the command is
//! safe to re-run after changing thresholds.

use tracing::info;

use dengo_api::db::TierRepository;

use super::{CommandError, database_url};

/// Default tier ladder: code, description, minimum visits.
pub const DEFAULT_TIERS: [(&str, &str, i32); 4] = [
    ("BRONCE", "Nivel inicial", 0),
    ("PLATA", "Cliente frecuente", 10),
    ("ORO", "Cliente consentido", 25),
    ("DIAMANTE", "Cliente Dengo de corazón", 50),
];

/// Upsert the default tier ladder.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or an upsert fails.
pub async fn tiers() -> Result<(), CommandError> {
    let database_url = database_url()?;
    let pool = dengo_api::db::create_pool(&database_url).await?;
    info!("Connected to database");

    let repo = TierRepository::new(&pool);
    for (code, description, min_visits) in DEFAULT_TIERS {
        let tier = repo.upsert(code, description, min_visits).await?;
        info!(id = %tier.id, code, min_visits, "Tier seeded");
    }

    info!("Seeding complete! {} tiers installed", DEFAULT_TIERS.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder_is_ascending() {
        let minimums: Vec<i32> = DEFAULT_TIERS.iter().map(|(_, _, min)| *min).collect();
        assert_eq!(minimums.first(), Some(&0));
        assert!(minimums.is_sorted_by(|a, b| a < b));
    }
}
