use configkit::{Builder, Configurable, DefaultConfig, Fields, Map};

#[derive(Debug, Default)]
struct AppSection {
    name: String,
    debug: bool,
}

impl Configurable for AppSection {
    fn describe<'a>(&'a mut self, fields: &mut Fields<'a>) {
        fields.field("Name", &mut self.name);
        fields.field("Debug", &mut self.debug).default("false");
    }
}

#[derive(Debug, Default)]
struct DatabaseSection {
    host: String,
    port: u16,
    name: String,
    url: String,
}

impl DefaultConfig for DatabaseSection {
    fn default_config(&self) -> Map {
        Map::from([
            ("Host", "localhost"),
            ("Port", "5432"),
            ("Url", "postgres://${Database.Host}:${Database.Port}/${Database.Name}"),
        ])
    }
}

impl Configurable for DatabaseSection {
    fn describe<'a>(&'a mut self, fields: &mut Fields<'a>) {
        fields.default_config(&*self);
        fields.field("Host", &mut self.host);
        fields.field("Port", &mut self.port);
        fields.field("Name", &mut self.name);
        fields.field("Url", &mut self.url);
    }
}

#[derive(Debug, Default)]
struct AppConfig {
    app: AppSection,
    database: DatabaseSection,
}

impl Configurable for AppConfig {
    fn describe<'a>(&'a mut self, fields: &mut Fields<'a>) {
        fields.nested("App", &mut self.app);
        fields.nested("Database", &mut self.database);
    }
}

fn main() -> Result<(), configkit::ConfigError> {
    let config: AppConfig = Builder::new()
        .merge_data("App__Name=demo\nDatabase__Name=demo_db\n")
        .merge_optional_file("demos/local.conf")
        .merge_environ("DEMO_")
        .build_default()?;

    println!("App: {} (debug={})", config.app.name, config.app.debug);
    println!("Database URL: {}", config.database.url);

    Ok(())
}
