//! Human-readable order summaries.
//!
//! Both composers are pure: identical inputs produce byte-identical text.

use core::fmt::Write as _;

use crate::models::{ContactInfo, Design};
use crate::types::options::label_or_empty;
use crate::types::{DesignId, OrderId, Price, TemplateId};

/// Render the order summary sent to the shop over WhatsApp.
///
/// Option labels come from the registered option tables. A value this build
/// does not know is printed verbatim and an unset option prints as empty.
#[must_use]
pub fn compose_order_message(
    order_id: OrderId,
    contact: &ContactInfo,
    design: &Design,
    price: Price,
) -> String {
    let region = contact
        .state()
        .map_or_else(String::new, |state| format!(", {state}"));

    let lines = [
        format!("🛍️ *New CaseCraft Order* — #{}", order_id.short_code()),
        String::new(),
        "👤 *Customer Details*".to_owned(),
        format!("• Name: {}", contact.name),
        format!("• Email: {}", contact.email),
        format!("• Phone: {}", contact.phone),
        String::new(),
        "📦 *Shipping Address*".to_owned(),
        format!("• {}", contact.address),
        format!("• {}{region} {}", contact.city, contact.postal_code),
        format!("• {}", contact.country),
        String::new(),
        "📱 *Case Details*".to_owned(),
        format!("• Model: {}", label_or_empty(design.phone_model.as_ref())),
        format!("• Color: {}", label_or_empty(design.case_color.as_ref())),
        format!("• Material: {}", label_or_empty(design.case_material.as_ref())),
        format!("• Finish: {}", label_or_empty(design.case_finish.as_ref())),
        String::new(),
        format!("💰 *Total: {}*", price.display()),
        String::new(),
        "🖼️ *Design Image*".to_owned(),
        design.final_image_url().to_owned(),
    ];

    lines.join("\n")
}

/// Subject line of the customer confirmation email.
#[must_use]
pub fn confirmation_subject(design_id: Option<DesignId>) -> String {
    design_id.map_or_else(
        || "Order Confirmation - Custom Case Design".to_owned(),
        |id| format!("Order Confirmation - {id}"),
    )
}

/// Render the plain-text confirmation email for the email order flow.
#[must_use]
pub fn compose_confirmation_email(
    contact: &ContactInfo,
    template_id: &TemplateId,
    design_id: Option<DesignId>,
) -> String {
    let mut body = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(body, "Hello {},", contact.name);
    body.push('\n');
    body.push_str("Thank you for ordering a custom phone case from CaseCraft!\n\n");
    body.push_str("We've received your order with the following details:\n\n");

    body.push_str("CONTACT INFORMATION\n");
    let _ = writeln!(body, "Name: {}", contact.name);
    let _ = writeln!(body, "Email: {}", contact.email);
    let _ = writeln!(body, "Phone: {}", contact.phone);
    body.push('\n');

    body.push_str("SHIPPING ADDRESS\n");
    let _ = writeln!(body, "{}", contact.address);
    let _ = writeln!(body, "{}, {}", contact.city, contact.postal_code);
    match contact.state() {
        Some(state) => {
            let _ = writeln!(body, "{state}, {}", contact.country);
        }
        None => {
            let _ = writeln!(body, "{}", contact.country);
        }
    }
    body.push('\n');

    body.push_str("ORDER DETAILS\n");
    let _ = writeln!(body, "Template: {template_id}");
    match design_id {
        Some(id) => {
            let _ = writeln!(body, "Design ID: {id}");
        }
        None => body.push_str("Custom Design\n"),
    }
    body.push('\n');

    body.push_str(
        "NEXT STEPS\n\
         Our team will review your order and send you a quote with:\n\
         - Final pricing\n\
         - Design customization options\n\
         - Estimated delivery date\n\
         - Payment instructions\n\n\
         We typically respond within 24 hours during business days.\n\n\
         If you have any questions or would like to discuss custom options, \
         feel free to reach out!\n\n\
         Best regards,\n\
         The CaseCraft Team\n\
         \"Your phone, your canvas.\"\n\n\
         ---\n\
         This is an automated message. Please reply to this email or contact our team directly.",
    );

    body
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::design::fixtures::configured_design;
    use crate::pricing::PriceSchedule;
    use crate::types::{CaseColor, Choice};

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Ada Lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
            phone: "+94 75 535 4830".to_owned(),
            address: "12 Galle Road".to_owned(),
            city: "Colombo".to_owned(),
            postal_code: "00300".to_owned(),
            country: "Sri Lanka".to_owned(),
            state: Some("Western".to_owned()),
        }
    }

    fn order_id() -> OrderId {
        OrderId::from_uuid(uuid::Uuid::parse_str("abcdef12-3456-4789-8abc-def012345678").unwrap())
    }

    #[test]
    fn test_message_layout() {
        let design = configured_design();
        let price = PriceSchedule::default().quote_design(&design);
        let message = compose_order_message(order_id(), &contact(), &design, price);
        let lines: Vec<&str> = message.lines().collect();

        assert_eq!(lines[0], "🛍️ *New CaseCraft Order* — #ABCDEF12");
        assert_eq!(lines[1], "");
        assert_eq!(lines[3], "• Name: Ada Lovelace");
        assert_eq!(lines[9], "• Colombo, Western 00300");
        assert_eq!(lines[13], "• Model: iPhone 14");
        assert_eq!(lines[14], "• Color: Copper");
        assert_eq!(lines[15], "• Material: Soft Polycarbonate");
        assert_eq!(lines[16], "• Finish: Textured Finish");
        assert_eq!(lines[18], "💰 *Total: $13.50*");
        assert_eq!(lines.len(), 22);
        assert_eq!(lines[21], design.cropped_image_url.as_deref().unwrap());
    }

    #[test]
    fn test_message_is_deterministic() {
        let design = configured_design();
        let price = PriceSchedule::default().quote_design(&design);
        let a = compose_order_message(order_id(), &contact(), &design, price);
        let b = compose_order_message(order_id(), &contact(), &design, price);
        assert_eq!(a, b);
    }

    #[test]
    fn test_message_falls_back_to_original_image() {
        let mut design = configured_design();
        design.cropped_image_url = None;
        let price = PriceSchedule::default().quote_design(&design);
        let message = compose_order_message(order_id(), &contact(), &design, price);
        assert_eq!(message.lines().last(), Some(design.image_url.as_str()));
    }

    #[test]
    fn test_unregistered_and_missing_options() {
        let mut design = configured_design();
        design.case_color = Some(Choice::<CaseColor>::parse("sunset-orange"));
        design.phone_model = None;
        let contact = ContactInfo {
            state: None,
            ..contact()
        };
        let price = PriceSchedule::default().quote_design(&design);
        let message = compose_order_message(order_id(), &contact, &design, price);

        assert!(message.contains("• Color: sunset-orange\n"));
        assert!(message.contains("• Model: \n"));
        assert!(message.contains("• Colombo 00300\n"));
    }

    #[test]
    fn test_confirmation_email() {
        let design = configured_design();
        let body = compose_confirmation_email(&contact(), &design.template_id, Some(design.id));

        assert!(body.starts_with("Hello Ada Lovelace,\n"));
        assert!(body.contains("Colombo, 00300\nWestern, Sri Lanka\n"));
        assert!(body.contains("Template: geometric-hex\n"));
        assert!(body.contains(&format!("Design ID: {}\n", design.id)));
        assert!(body.contains("The CaseCraft Team"));
    }

    #[test]
    fn test_confirmation_without_design() {
        let body = compose_confirmation_email(&contact(), &TemplateId::default(), None);
        assert!(body.contains("Custom Design\n"));
        assert_eq!(
            confirmation_subject(None),
            "Order Confirmation - Custom Case Design"
        );
    }
}
