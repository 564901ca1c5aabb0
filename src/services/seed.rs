//! Demo data seeding.
//!
//! Fills the authors, users and books tables with generated data when they are
//! empty. Each table is checked on its own, so a partially seeded database is
//! completed rather than duplicated.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::SeedConfig,
    error::{AppError, AppResult},
    models::{author::CreateAuthor, book::CreateBook, user::CreateUser},
    repository::{Repository, Table},
};

const FIRST_NAMES: &[&str] = &[
    "Ada", "Boris", "Clara", "Dmitri", "Elena", "Felix", "Greta", "Hugo", "Irina", "Jonas",
    "Katya", "Leon", "Mira", "Nikolai", "Olga", "Pavel", "Rosa", "Sergei", "Tanya", "Viktor",
];

const LAST_NAMES: &[&str] = &[
    "Abbott", "Belov", "Carver", "Dorn", "Evans", "Fischer", "Gorky", "Hale", "Ivanova", "Jensen",
    "Klein", "Lebedev", "Moreau", "Novak", "Orlov", "Petrov", "Quinn", "Rossi", "Sokolov", "Turner",
];

const TITLE_ADJECTIVES: &[&str] = &[
    "Silent", "Lost", "Crimson", "Hidden", "Last", "Frozen", "Golden", "Broken", "Distant", "Secret",
];

const TITLE_NOUNS: &[&str] = &[
    "River", "Garden", "Empire", "Voyage", "Letters", "Harbor", "Winter", "Orchard", "Tower", "Crown",
];

const GENRES: &[&str] = &[
    "historical fiction", "mystery", "science fiction", "poetry", "fantasy", "romance", "satire",
];

const COUNTRIES: &[&str] = &[
    "Portugal", "Norway", "Chile", "Japan", "Kenya", "Canada", "Poland", "Georgia",
];

fn pick<'a, R: Rng>(rng: &mut R, words: &[&'a str]) -> &'a str {
    words[rng.gen_range(0..words.len())]
}

pub fn fake_name<R: Rng>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

/// Email derived from a name; `n` keeps generated addresses unique
pub fn fake_email(name: &str, n: usize) -> String {
    let local = name.to_lowercase().replace(' ', ".");
    format!("{}{}@example.com", local, n)
}

pub fn fake_title<R: Rng>(rng: &mut R) -> String {
    format!("The {} {}", pick(rng, TITLE_ADJECTIVES), pick(rng, TITLE_NOUNS))
}

pub fn fake_biography<R: Rng>(rng: &mut R, name: &str) -> String {
    format!(
        "{} (born {}) is a writer from {}, known for {}.",
        name,
        rng.gen_range(1920..2000),
        pick(rng, COUNTRIES),
        pick(rng, GENRES)
    )
}

#[derive(Clone)]
pub struct SeedService {
    repository: Repository,
    config: SeedConfig,
}

impl SeedService {
    pub fn new(repository: Repository, config: SeedConfig) -> Self {
        Self { repository, config }
    }

    /// Seed every empty table. Does nothing when seeding is disabled.
    pub async fn run(&self) -> AppResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let mut rng = StdRng::from_entropy();

        if !self.repository.table_has_rows(Table::Authors).await? {
            for _ in 0..self.config.authors {
                let name = fake_name(&mut rng);
                let biography = fake_biography(&mut rng, &name);
                self.repository
                    .authors
                    .create(&CreateAuthor {
                        name,
                        biography: Some(biography),
                    })
                    .await?;
            }
            tracing::info!("Seeded {} authors", self.config.authors);
        }

        if !self.repository.table_has_rows(Table::Users).await? {
            for n in 0..self.config.users {
                let name = fake_name(&mut rng);
                let email = fake_email(&name, n);
                self.repository
                    .users
                    .create(&CreateUser { name, email })
                    .await?;
            }
            tracing::info!("Seeded {} users", self.config.users);
        }

        if !self.repository.table_has_rows(Table::Books).await? {
            let authors = self.repository.authors.list().await?;
            if authors.is_empty() {
                return Err(AppError::Internal("No authors found to assign books".to_string()));
            }

            for _ in 0..self.config.books {
                let author = &authors[rng.gen_range(0..authors.len())];
                self.repository
                    .books
                    .create(&CreateBook {
                        title: fake_title(&mut rng),
                        author_id: author.id,
                    })
                    .await?;
            }
            tracing::info!("Seeded {} books", self.config.books);
        }

        Ok(())
    }
}
