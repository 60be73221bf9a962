use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        customers::CustomerList,
        dashboard::{DailyPoint, DashboardSummary, StatBlock},
        products::ProductList,
        sales::{SaleList, SaleWithItems},
        subscribers::SubscriberList,
        whatsapp::DispatchReport,
    },
    models::{Customer, Product, Sale, SaleItem, Subscriber},
    response::{ApiResponse, Meta},
    routes::{
        customers, dashboard, health, newsletters, products as product_routes, sales, whatsapp,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::patch_product,
        product_routes::delete_product,
        product_routes::adjust_stock,
        product_routes::list_low_stock,
        customers::list_customers,
        customers::get_customer,
        customers::create_customer,
        customers::update_customer,
        customers::delete_customer,
        sales::list_sales,
        sales::get_sale,
        sales::create_sale,
        sales::update_sale,
        sales::delete_sale,
        newsletters::list_subscribers,
        newsletters::get_subscriber,
        newsletters::create_subscriber,
        newsletters::update_subscriber,
        newsletters::delete_subscriber,
        newsletters::bulk_update_tags,
        whatsapp::send_bulk,
        whatsapp::send_test,
        dashboard::summary,
        dashboard::clear_cache,
    ),
    components(
        schemas(
            Product,
            Customer,
            Sale,
            SaleItem,
            Subscriber,
            ProductList,
            CustomerList,
            SaleList,
            SaleWithItems,
            SubscriberList,
            DispatchReport,
            DashboardSummary,
            StatBlock,
            DailyPoint,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Customer>,
            ApiResponse<CustomerList>,
            ApiResponse<SaleWithItems>,
            ApiResponse<SaleList>,
            ApiResponse<Subscriber>,
            ApiResponse<SubscriberList>,
            ApiResponse<DispatchReport>,
            ApiResponse<DashboardSummary>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog and stock endpoints"),
        (name = "Customers", description = "Customer record endpoints"),
        (name = "Sales", description = "Sale recording and inventory flow"),
        (name = "Newsletters", description = "Newsletter subscriber endpoints"),
        (name = "WhatsApp", description = "Marketing message dispatch"),
        (name = "Dashboard", description = "Summary statistics"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
