//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use named_injector::prelude::*;

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct UserService {
    db: Arc<Database>,
}

fn main() -> Result<()> {
    named_injector::logging::builder().trace().container_only().init();

    println!("=== Named Injector Logging Demo ===\n");

    // logs: "Creating new DI container"
    let container = Container::new();

    // logs: "Registering service"
    container.singleton("database.url", String::from("postgres://localhost/mydb"))?;
    container.register(
        ServiceDefinition::new("database", |deps: Dependencies| async move {
            let url = deps.get::<String>(0)?;
            println!("  [App] Connecting to {url}...");
            Ok::<_, BoxError>(Database {
                url: url.as_ref().clone(),
            })
        })
        .with_dependencies(["database.url"]),
    )?;
    container.register(
        ServiceDefinition::from_fn("services.users", |deps: Dependencies| {
            Ok::<_, BoxError>(UserService { db: deps.get(0)? })
        })
        .with_dependencies(["database"])
        .with_behaviour("announced", json!({ "prefix": "[ready]" })),
    )?;

    // logs: "Registering behaviour"
    container.register_behaviour(
        "announced",
        Vec::<String>::new(),
        |service: Service, config: &Value, _: &Dependencies| {
            let prefix = config["prefix"].as_str().unwrap_or("");
            println!("  [App] {prefix} service decorated");
            Ok::<_, BoxError>(service)
        },
    )?;

    println!("\n--- Resolving services ---\n");

    futures::executor::block_on(async {
        // logs: "Constructing service" for services.users, database, database.url
        let users = container.get_as::<UserService>("services.users").await?;
        println!("  [App] UserService uses {}", users.db.url);

        // logs: "Service resolved from memo"
        let again = container.get_as::<UserService>("services.users").await?;
        assert!(Arc::ptr_eq(&users, &again));

        // logs: "Expanding wildcard service name"
        let all = container.get_all("services.*").await?;
        println!("  [App] {} service(s) under services.*", all.len());

        // Unregistered names fail without constructing anything
        if let Err(err) = container.get("cache").await {
            println!("  [App] {err}");
        }

        Ok::<_, DiError>(())
    })?;

    println!("\n=== Demo Complete ===");
    Ok(())
}
