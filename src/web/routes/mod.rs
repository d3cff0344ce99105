pub mod rental_routes;
