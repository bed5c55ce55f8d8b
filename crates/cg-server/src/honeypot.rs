use crate::proxy;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::Responder;

/// Decoy paths scanners hammer first. None of them exist; all of them
/// are logged with the client address for fail2ban to chew on.
pub const DECOYS: [&str; 12] = [
    "/wp-admin",
    "/wp-login.php",
    "/.env",
    "/.git/config",
    "/phpmyadmin",
    "/admin.php",
    "/config.php",
    "/xmlrpc.php",
    "/vendor/phpunit/phpunit/src/Util/PHP/eval-stdin.php",
    "/actuator/env",
    "/boaform/admin/formLogin",
    "/cgi-bin/luci",
];

pub async fn snare(req: HttpRequest) -> impl Responder {
    log::warn!(
        "[honeypot] {} poked {}",
        proxy::request_ip(&req),
        req.path()
    );
    HttpResponse::NotFound().body("404 page not found")
}
