//! Example consumer: mounts `books` and `authors` resources backed by PostgreSQL.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Expects tables `books (id bigserial, title text, author_id bigint)` and `authors (id bigserial, name text)`.

use resource_router::{
    init, options_from_env, IncludeDirection, PgModel, ResourceDescriptor, TableSpec,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("resource_router=info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/library".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let authors_table = TableSpec::new("authors", "id");

    let books = PgModel::new(pool.clone(), "Book", "books")
        .with_relation("author", IncludeDirection::ToOne, authors_table, "author_id", "id")
        .with_catalog_types()
        .await?;
    let authors = PgModel::new(pool, "Author", "authors");

    let resources = init(
        options_from_env()?
            .resource(Arc::new(books))
            .resource(ResourceDescriptor::new(Arc::new(authors)).collection_name("writers")),
    )?;

    if let Some(hooks) = resources.hooks("books") {
        hooks.after_create_item(|ctx| {
            tracing::info!(book = ?ctx.result, "book created");
        });
    }
    resources.hook_setter("beforeDeleteAuthor")?.register(|ctx| {
        tracing::info!(identifier = ?ctx.identifier, "deleting author");
    });

    let app = axum::Router::new().nest("/api/v1", resources.into_router());
    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
