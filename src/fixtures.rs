#[cfg(test)]
pub mod test {
    use confique::Config;
    use serde::{Deserialize, Serialize};

    use crate::check::required;
    use crate::schema::{Describe, Field, Schema, Target};
    use crate::value::TypeTag;

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct TestConfig {
        /// The application host.
        #[config(default = "localhost")]
        pub host: String,

        /// The port number.
        #[config(default = 8080)]
        pub port: u16,

        /// Enable debug mode.
        #[config(default = false)]
        pub debug: bool,

        /// Database settings.
        #[config(nested)]
        pub database: TestDbConfig,
    }

    #[derive(Config, Serialize, Deserialize, Debug, PartialEq)]
    pub struct TestDbConfig {
        /// Connection string URL.
        pub url: Option<String>,

        /// Connection pool size.
        #[config(default = 5)]
        pub pool_size: usize,
    }

    impl Describe for TestConfig {
        fn describe() -> Target {
            Target::Single(Schema::from_confique(&TestConfig::META))
        }
    }

    #[test]
    fn test_config_loads_defaults() {
        let config = TestConfig::builder().load().unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.database.url, None);
        assert_eq!(config.database.pool_size, 5);
    }

    // -- Person: one required field, one default -------------------------------

    pub fn person() -> Schema {
        Schema::new("Person")
            .field(Field::new("name", TypeTag::Str).validator(required()))
            .field(Field::new("age", TypeTag::Int).default(4))
    }

    #[derive(Deserialize, Debug, PartialEq)]
    pub struct Person {
        pub name: String,
        pub age: i64,
    }

    impl Describe for Person {
        fn describe() -> Target {
            Target::Single(person())
        }
    }

    // -- Commands: two candidates sharing a field from a common ancestor --------

    pub fn common() -> Schema {
        Schema::new("Common").field(Field::new("shared", TypeTag::Int).doc("Shared setting."))
    }

    pub fn commands() -> Vec<Schema> {
        let build = Schema::new("Build")
            .doc("Build the project.")
            .field(Field::new("release", TypeTag::Bool).default(false))
            .extends(&common());
        let deploy = Schema::new("Deploy")
            .doc("Ship it.")
            .field(Field::new("target", TypeTag::Str))
            .extends(&common());
        vec![build, deploy]
    }

    #[derive(Deserialize, Debug, PartialEq)]
    pub enum Command {
        Build { shared: i64, release: bool },
        Deploy { shared: i64, target: String },
    }

    impl Describe for Command {
        fn describe() -> Target {
            Target::Candidates(commands())
        }
    }

    // -- Server: groups, collections and a nested union -------------------------

    pub fn server() -> Schema {
        let database = Schema::new("Database")
            .field(Field::new("url", TypeTag::optional(TypeTag::Str)))
            .field(Field::new("pool_size", TypeTag::Int).default(5));
        let plain = Schema::new("Plain").doc("No encryption.");
        let tls = Schema::new("Tls")
            .doc("Serve over TLS.")
            .field(Field::new("cert", TypeTag::Path).doc("Certificate file."));
        Schema::new("Server")
            .field(Field::new("name", TypeTag::Str))
            .field(Field::new("port", TypeTag::Int).default(8080))
            .field(Field::new("tags", TypeTag::list(TypeTag::Str)).default(toml::Value::Array(vec![])))
            .field(Field::group("database", database))
            .field(Field::union("mode", vec![plain, tls]))
    }
}
