//! Test fixtures, enabled by the `test-utils` feature.

/// Embedded `PostgreSQL` server for integration tests that need a real database.
pub mod postgres {
    use postgresql_embedded::PostgreSQL;
    use tracing::info;

    use crate::config::ConnectionConfig;

    /// A running embedded `PostgreSQL` instance and a config pointing at its test database.
    pub struct EmbeddedPostgres {
        postgresql: PostgreSQL,
        config: ConnectionConfig,
    }

    impl EmbeddedPostgres {
        #[must_use]
        pub fn config(&self) -> &ConnectionConfig {
            &self.config
        }
    }

    /// Install (bundled binaries), start and provision an embedded server with `database`.
    ///
    /// # Errors
    /// Returns an error if the server cannot be set up or started, or the database cannot be
    /// created.
    pub async fn setup_postgres_embedded(
        database: &str,
    ) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
        let mut postgresql = PostgreSQL::default();
        postgresql.setup().await?;
        postgresql.start().await?;
        postgresql.create_database(database).await?;

        let settings = postgresql.settings();
        let config = ConnectionConfig::new(
            settings.host.clone(),
            settings.port,
            settings.username.clone(),
            settings.password.clone(),
        )
        .with_namespace(database);
        info!("embedded PostgreSQL started on {}:{}", config.host(), config.port());

        Ok(EmbeddedPostgres { postgresql, config })
    }

    /// Stop a server started by [`setup_postgres_embedded`].
    pub async fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
        let EmbeddedPostgres { postgresql, .. } = postgres;
        let _ = postgresql.stop().await;
    }
}
