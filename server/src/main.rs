use std::io;

use actix_web::{App, HttpServer};

use sketchboard_server::config::Config;
use sketchboard_server::handlers;
use sketchboard_server::server::spawn_server;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config =
        Config::from_env().map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    let srv_tx = spawn_server();
    let address = (config.bind_address.clone(), config.port);

    log::info!("Server is running on {}:{}", address.0, address.1);
    HttpServer::new(move || {
        App::new()
            .data(srv_tx.clone())
            .data(config.clone())
            .configure(handlers::root)
    })
    .bind(address)?
    .run()
    .await
}
