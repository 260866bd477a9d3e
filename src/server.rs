//! Plugin HTTP surface
//!
//! Routes the Docker volume plugin endpoints to a shared [`Driver`]. Driver
//! calls do file I/O and may wait on a mount command, so they run on the
//! actix blocking pool.
//!
//! ## Endpoints (all POST)
//!
//! /Plugin.Activate - plugin manifest
//! /VolumeDriver.Create - create a volume (`cmd` option required)
//! /VolumeDriver.Get - describe a volume
//! /VolumeDriver.List - list volumes
//! /VolumeDriver.Remove - forget a volume
//! /VolumeDriver.Path - mountpoint of a volume
//! /VolumeDriver.Mount - run the mount command, return the mountpoint
//! /VolumeDriver.Unmount - acknowledge
//! /VolumeDriver.Capabilities - scope descriptor

use std::io;
use std::path::Path;

use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::{info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::driver::Driver;
use crate::errors::{Result, VolmexError};
use crate::protocol::{
    self, ACTIVATE_PATH, CAPABILITIES_PATH, CONTENT_TYPE, CREATE_PATH, CapabilitiesResponse,
    CreateRequest, ErrorResponse, GET_PATH, GetResponse, LIST_PATH, ListResponse, MOUNT_PATH,
    MountRequest, MountpointResponse, NameRequest, PATH_PATH, PluginManifest, REMOVE_PATH,
    UNMOUNT_PATH,
};

/// Register the plugin routes. The app must carry `web::Data<Driver>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(ACTIVATE_PATH, web::post().to(activate))
        .route(CREATE_PATH, web::post().to(create))
        .route(GET_PATH, web::post().to(get))
        .route(LIST_PATH, web::post().to(list))
        .route(REMOVE_PATH, web::post().to(remove))
        .route(PATH_PATH, web::post().to(path))
        .route(MOUNT_PATH, web::post().to(mount))
        .route(UNMOUNT_PATH, web::post().to(unmount))
        .route(CAPABILITIES_PATH, web::post().to(capabilities));
}

/// Serve `driver` on a unix socket until actix receives SIGINT or SIGTERM
pub async fn serve_unix(driver: Driver, socket: &Path) -> io::Result<()> {
    let driver = web::Data::new(driver);

    info!("Serving volume plugin on {}", socket.display());
    HttpServer::new(move || {
        App::new()
            .app_data(driver.clone())
            .wrap(middleware::Logger::new("%r %s %Dms"))
            .configure(configure)
    })
    .bind_uds(socket)?
    .run()
    .await
}

// ============ Response helpers ============

fn ok(body: impl Serialize) -> HttpResponse {
    HttpResponse::Ok().content_type(CONTENT_TYPE).json(body)
}

fn failure(op: &str, name: &str, err: VolmexError) -> HttpResponse {
    warn!("{} {:?} failed: {}", op, name, err);
    HttpResponse::InternalServerError()
        .content_type(CONTENT_TYPE)
        .json(ErrorResponse::new(err))
}

fn bad_request(op: &str, err: serde_json::Error) -> HttpResponse {
    warn!("{}: undecodable request: {}", op, err);
    HttpResponse::BadRequest()
        .content_type(CONTENT_TYPE)
        .json(ErrorResponse::new(err))
}

fn decode<T>(op: &str, body: &[u8]) -> std::result::Result<T, HttpResponse>
where
    T: DeserializeOwned + Default,
{
    protocol::decode(body).map_err(|e| bad_request(op, e))
}

/// Run a driver call on the blocking pool
async fn blocking<T, F>(driver: web::Data<Driver>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Driver) -> Result<T> + Send + 'static,
{
    web::block(move || f(driver.get_ref()))
        .await
        .map_err(|e| VolmexError::Io(io::Error::other(e.to_string())))?
}

// ============ Handlers ============

async fn activate() -> HttpResponse {
    ok(PluginManifest::default())
}

async fn create(body: web::Bytes, driver: web::Data<Driver>) -> HttpResponse {
    let req: CreateRequest = match decode("Create", &body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let name = req.name.clone();

    match blocking(driver, move |d| {
        d.create(&req.name, req.opts.unwrap_or_default())
    })
    .await
    {
        Ok(()) => ok(ErrorResponse::default()),
        Err(e) => failure("Create", &name, e),
    }
}

async fn get(body: web::Bytes, driver: web::Data<Driver>) -> HttpResponse {
    let req: NameRequest = match decode("Get", &body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let name = req.name.clone();

    match blocking(driver, move |d| d.get(&req.name)).await {
        Ok(record) => ok(GetResponse {
            volume: record.into(),
            err: String::new(),
        }),
        Err(e) => failure("Get", &name, e),
    }
}

async fn list(driver: web::Data<Driver>) -> HttpResponse {
    match blocking(driver, |d| d.list()).await {
        Ok(records) => ok(ListResponse {
            volumes: records.into_iter().map(Into::into).collect(),
            err: String::new(),
        }),
        Err(e) => failure("List", "", e),
    }
}

async fn remove(body: web::Bytes, driver: web::Data<Driver>) -> HttpResponse {
    let req: NameRequest = match decode("Remove", &body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let name = req.name.clone();

    match blocking(driver, move |d| d.remove(&req.name)).await {
        Ok(()) => ok(ErrorResponse::default()),
        Err(e) => failure("Remove", &name, e),
    }
}

async fn path(body: web::Bytes, driver: web::Data<Driver>) -> HttpResponse {
    let req: NameRequest = match decode("Path", &body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let name = req.name.clone();

    match blocking(driver, move |d| d.path(&req.name)).await {
        Ok(mountpoint) => ok(MountpointResponse {
            mountpoint,
            err: String::new(),
        }),
        Err(e) => failure("Path", &name, e),
    }
}

async fn mount(body: web::Bytes, driver: web::Data<Driver>) -> HttpResponse {
    let req: MountRequest = match decode("Mount", &body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let name = req.name.clone();
    info!("Mount of {} requested by {:?}", req.name, req.id);

    match blocking(driver, move |d| d.mount(&req.name)).await {
        Ok(mountpoint) => ok(MountpointResponse {
            mountpoint,
            err: String::new(),
        }),
        Err(e) => failure("Mount", &name, e),
    }
}

async fn unmount(body: web::Bytes, driver: web::Data<Driver>) -> HttpResponse {
    let req: MountRequest = match decode("Unmount", &body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    driver.unmount(&req.name);
    ok(ErrorResponse::default())
}

async fn capabilities(driver: web::Data<Driver>) -> HttpResponse {
    ok(CapabilitiesResponse {
        capabilities: driver.capabilities(),
    })
}
