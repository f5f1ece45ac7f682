use thiserror::Error;

/// Variable-name tables per service and environment. Declaration order is the
/// order variables end up in the generated file.
const FRONTEND_DEFAULT: &[&str] = &[];

const BACKEND_LOCAL: &[&str] = &[
    "BE_SS_SERVER_HOSTNAME",
    "BE_SS_SERVER_PORT",
    "BE_SS_SERVER_TOKEN_KEY",
];

const BACKEND_CONNECTED: &[&str] = &[
    "BE_CS_SERVER_HOSTNAME",
    "BE_CS_SERVER_PORT",
    "BE_CS_SERVER_TOKEN_KEY",
];

const DATABASE_LOCAL: &[&str] = &[
    "DB_SS_MONGODB_INITDB_ROOT_USERNAME",
    "DB_SS_MONGODB_INITDB_ROOT_PASSWORD",
    "DB_SS_MONGODB_INITDB_PORT",
    "DB_SS_MONGODB_CONNECTION_STRING",
];

const DATABASE_CONNECTED: &[&str] = &[
    "DB_CS_MONGODB_INITDB_ROOT_USERNAME",
    "DB_CS_MONGODB_INITDB_ROOT_PASSWORD",
    "DB_CS_MONGODB_INITDB_PORT",
    "DB_CS_MONGODB_CONNECTION_STRING",
];

const DATABASE_REMOTE: &[&str] = &["DB_RS_MONGODB_CONNECTION_STRING"];

const SERVICE_PREFIXES: [&str; 3] = ["FE_", "BE_", "DB_"];
const STAGE_CODES: [&str; 4] = ["SS_", "CS_", "RS_", "TS_"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Frontend,
    Backend,
    Database,
}

impl Service {
    pub fn parse(name: &str) -> Result<Self, ResolveError> {
        match name {
            "frontend" => Ok(Service::Frontend),
            "backend" => Ok(Service::Backend),
            "database" => Ok(Service::Database),
            other => Err(ResolveError::InvalidService(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Frontend => "frontend",
            Service::Backend => "backend",
            Service::Database => "database",
        }
    }

    fn default_environment(&self) -> &'static str {
        match self {
            Service::Frontend => "default",
            Service::Backend => "local",
            Service::Database => "local",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseMode {
    Local,
    Remote,
}

impl DatabaseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseMode::Local => "local",
            DatabaseMode::Remote => "remote",
        }
    }
}

/// One resolved variable: the raw table name used to look the value up, and
/// the stripped name written to the generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvVar {
    pub raw: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub variables: Vec<EnvVar>,
    pub environment: String,
    pub database: Option<DatabaseMode>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown service `{0}`, expected frontend, backend or database")]
    InvalidService(String),

    #[error("service `{service}` has no `{environment}` environment")]
    InvalidEnvironment { service: String, environment: String },

    #[error("database environment `{database}` conflicts with backend environment `{environment}`; use `remote` or matching environments")]
    InconsistentDatabaseEnvironment { environment: String, database: String },

    #[error("variable `{0}` does not match the `<service>_<stage>_<name>` form")]
    MalformedVariable(String),
}

/// `single` and `testing` are historical spellings of the local slot.
fn normalize(environment: &str) -> &str {
    match environment {
        "single" | "testing" => "local",
        other => other,
    }
}

fn environment_table(service: Service, environment: &str) -> Option<&'static [&'static str]> {
    match (service, environment) {
        (Service::Frontend, "default") => Some(FRONTEND_DEFAULT),
        (Service::Backend, "local") => Some(BACKEND_LOCAL),
        (Service::Backend, "connected") => Some(BACKEND_CONNECTED),
        (Service::Database, "local") => Some(DATABASE_LOCAL),
        (Service::Database, "connected") => Some(DATABASE_CONNECTED),
        (Service::Database, "remote") => Some(DATABASE_REMOTE),
        _ => None,
    }
}

fn strip_output_name(raw: &'static str) -> Result<&'static str, ResolveError> {
    let after_service = SERVICE_PREFIXES
        .iter()
        .find_map(|p| raw.strip_prefix(p))
        .ok_or_else(|| ResolveError::MalformedVariable(raw.to_string()))?;
    let name = STAGE_CODES
        .iter()
        .find_map(|c| after_service.strip_prefix(c))
        .ok_or_else(|| ResolveError::MalformedVariable(raw.to_string()))?;
    if name.is_empty() {
        return Err(ResolveError::MalformedVariable(raw.to_string()));
    }
    Ok(name)
}

/// Resolve the ordered variable list for a service/environment combination.
///
/// Backend resolutions pull in the matching database row after the backend's
/// own variables; a non-`remote` database mode must agree with the backend
/// environment. Frontend and bare database resolutions never mix rows, and
/// any database argument for them is ignored.
pub fn resolve(
    service: &str,
    environment: Option<&str>,
    database: Option<&str>,
) -> Result<Resolution, ResolveError> {
    let service = Service::parse(service)?;

    let environment = normalize(environment.unwrap_or_else(|| service.default_environment()));
    let service_vars =
        environment_table(service, environment).ok_or_else(|| ResolveError::InvalidEnvironment {
            service: service.as_str().to_string(),
            environment: environment.to_string(),
        })?;

    let mut raw: Vec<&'static str> = service_vars.to_vec();
    let mut database_mode = None;

    if service == Service::Backend {
        let database = database.map(normalize);
        if let Some(db) = database {
            if db != "remote" && db != environment {
                return Err(ResolveError::InconsistentDatabaseEnvironment {
                    environment: environment.to_string(),
                    database: db.to_string(),
                });
            }
        }

        let key = if database == Some("remote") { "remote" } else { environment };
        let db_vars = environment_table(Service::Database, key).ok_or_else(|| {
            ResolveError::InvalidEnvironment {
                service: Service::Database.as_str().to_string(),
                environment: key.to_string(),
            }
        })?;
        raw.extend_from_slice(db_vars);

        database_mode = Some(if database == Some("remote") {
            DatabaseMode::Remote
        } else {
            DatabaseMode::Local
        });
    }

    // Duplicates are kept as-is; the tables own uniqueness, not the resolver.
    let variables = raw
        .into_iter()
        .map(|r| strip_output_name(r).map(|name| EnvVar { raw: r, name }))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Resolution {
        variables,
        environment: environment.to_string(),
        database: database_mode,
    })
}
