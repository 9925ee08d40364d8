//! Logistics Management System demo program
//!
//! Menu-driven console over in-memory stores for vehicles, customers,
//! shipments and deliveries. Every menu redisplays after each action and returns to its
//! parent on `q`, `Q`, `quit`, `Quit` or `0`.

use async_trait::async_trait;

use super::{Program, ProgramIo};
use crate::core::error::Result;

/// Inputs that leave the current menu
const QUIT_OPTIONS: [&str; 5] = ["q", "Q", "quit", "Quit", "0"];

const RULE_WIDTH: usize = 30;

/// Insertion-ordered store with auto-incremented string ids
#[derive(Debug)]
struct DataStore<T> {
    items: Vec<(String, T)>,
    last_id: u64,
}

impl<T> Default for DataStore<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            last_id: 0,
        }
    }
}

impl<T> DataStore<T> {
    fn add(&mut self, item: T) -> String {
        self.last_id += 1;
        let id = self.last_id.to_string();
        self.items.push((id.clone(), item));
        id
    }

    fn find(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|(k, _)| k == id).map(|(_, v)| v)
    }

    fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|(k, _)| k != id);
        self.items.len() != before
    }

    fn all(&self) -> impl Iterator<Item = &(String, T)> {
        self.items.iter()
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Vehicle {
    kind: String,
    capacity: String,
    status: String,
}

#[derive(Debug, Clone)]
struct Customer {
    name: String,
    contact: String,
    address: String,
    shipment_ids: Vec<String>,
}

#[derive(Debug, Clone)]
struct Shipment {
    customer_id: String,
    origin: String,
    destination: String,
    contents: String,
    weight: String,
    vehicle_id: Option<String>,
    status: String,
    delivery_id: Option<String>,
}

#[derive(Debug, Clone)]
struct Delivery {
    shipment_id: String,
    date: String,
    status: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Area {
    Fleet,
    Customers,
    Shipments,
    Deliveries,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    AddVehicle,
    UpdateVehicle,
    RemoveVehicle,
    ViewVehicles,
    AddCustomer,
    UpdateCustomer,
    RemoveCustomer,
    ViewCustomers,
    ViewCustomerShipments,
    CreateShipment,
    TrackShipment,
    ViewShipments,
    MarkDelivery,
    ViewDeliveryStatus,
}

/// Menu entry: number, description, choice (`None` leaves the menu)
type MenuOption<A> = (&'static str, &'static str, Option<A>);

struct Menu<A: 'static> {
    title: &'static str,
    options: &'static [MenuOption<A>],
}

const MAIN_MENU: Menu<Area> = Menu {
    title: "Logistics Management System",
    options: &[
        ("1", "Fleet Management", Some(Area::Fleet)),
        ("2", "Customer Management", Some(Area::Customers)),
        ("3", "Shipment Management", Some(Area::Shipments)),
        ("4", "Delivery Management", Some(Area::Deliveries)),
        ("0", "Quit", None),
    ],
};

const FLEET_MENU: Menu<Action> = Menu {
    title: "Fleet Management",
    options: &[
        ("1", "Add a vehicle", Some(Action::AddVehicle)),
        ("2", "Update vehicle information", Some(Action::UpdateVehicle)),
        ("3", "Remove a vehicle", Some(Action::RemoveVehicle)),
        ("4", "View all vehicles", Some(Action::ViewVehicles)),
        ("5", "Quit fleet management", None),
    ],
};

const CUSTOMER_MENU: Menu<Action> = Menu {
    title: "Customer Management",
    options: &[
        ("1", "Add a customer", Some(Action::AddCustomer)),
        ("2", "Update customer information", Some(Action::UpdateCustomer)),
        ("3", "Remove a customer", Some(Action::RemoveCustomer)),
        ("4", "View all customers", Some(Action::ViewCustomers)),
        ("5", "View a customer's shipments", Some(Action::ViewCustomerShipments)),
        ("6", "Quit customer management", None),
    ],
};

const SHIPMENT_MENU: Menu<Action> = Menu {
    title: "Shipment Management",
    options: &[
        ("1", "Create a new shipment", Some(Action::CreateShipment)),
        ("2", "Track a shipment", Some(Action::TrackShipment)),
        ("3", "View all shipments", Some(Action::ViewShipments)),
        ("4", "Quit shipment management", None),
    ],
};

const DELIVERY_MENU: Menu<Action> = Menu {
    title: "Delivery Management",
    options: &[
        ("1", "Mark shipment delivery", Some(Action::MarkDelivery)),
        ("2", "View delivery status for a shipment", Some(Action::ViewDeliveryStatus)),
        ("3", "Quit delivery management", None),
    ],
};

/// Read a line, falling back to `default` when left empty
async fn input_or(io: &ProgramIo, prompt: &str, default: &str) -> Result<String> {
    let value = io.input(prompt).await?;
    Ok(if value.is_empty() { default.to_string() } else { value })
}

fn rule(io: &ProgramIo) -> Result<()> {
    io.print(&"-".repeat(RULE_WIDTH))
}

#[derive(Debug)]
pub struct Logistics {
    vehicles: DataStore<Vehicle>,
    customers: DataStore<Customer>,
    shipments: DataStore<Shipment>,
    deliveries: DataStore<Delivery>,
}

impl Default for Logistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Logistics {
    /// Empty stores; `load()` seeds the demo data
    pub fn new() -> Self {
        Self {
            vehicles: DataStore::default(),
            customers: DataStore::default(),
            shipments: DataStore::default(),
            deliveries: DataStore::default(),
        }
    }

    fn seed(&mut self) {
        let vehicles = [
            ("Truck", "5000", "Available"),
            ("Car", "500", "In service"),
            ("Truck", "3500", "Available"),
        ];
        for (kind, capacity, status) in vehicles {
            self.vehicles.add(Vehicle {
                kind: kind.to_string(),
                capacity: capacity.to_string(),
                status: status.to_string(),
            });
        }

        let customers = [
            ("Acme Corp", "orders@acme.example", "100 Industrial Way, Seattle, Wa"),
            ("Globex", "555-0142", "42 Globex Plaza, Portland, Or"),
            ("Initech", "billing@initech.example", "4120 Freidrich Ln, Austin, Tx"),
        ];
        for (name, contact, address) in customers {
            self.customers.add(Customer {
                name: name.to_string(),
                contact: contact.to_string(),
                address: address.to_string(),
                shipment_ids: Vec::new(),
            });
        }

        let shipments = [
            ("1", "123 Main St, Seattle, Wa", "321 Elm St, Miami, Fl", "25.5", "1"),
            ("2", "456 Oak Ave, Portland, Or", "654 Maple Rd, Austin, Tx", "12", "2"),
            ("3", "789 Pine Blvd, San Francisco, Ca", "987 Cedar Ln, Denver, Co", "67.8", "3"),
        ];
        for (customer_id, origin, destination, weight, vehicle) in shipments {
            let id = self.shipments.add(Shipment {
                customer_id: customer_id.to_string(),
                origin: origin.to_string(),
                destination: destination.to_string(),
                contents: "General freight".to_string(),
                weight: weight.to_string(),
                vehicle_id: Some(vehicle.to_string()),
                status: "Pending".to_string(),
                delivery_id: None,
            });
            if let Some(customer) = self.customers.find_mut(customer_id) {
                customer.shipment_ids.push(id);
            }
        }
    }

    /// Show `menu` until a valid choice; `None` when the user quits
    async fn choose<A: Copy + 'static>(&self, io: &ProgramIo, menu: &Menu<A>) -> Result<Option<A>> {
        loop {
            io.print(&format!("\n=== {} ===", menu.title))?;
            for (number, description, _) in menu.options {
                io.print(&format!("{}. {}", number, description))?;
            }

            let choice = io.input("\nEnter your choice: ").await?;
            let choice = choice.trim();

            let selected = if QUIT_OPTIONS.contains(&choice) {
                Some(None)
            } else {
                menu.options
                    .iter()
                    .find(|(number, description, _)| {
                        choice == *number || choice.eq_ignore_ascii_case(description)
                    })
                    .map(|(_, _, action)| *action)
            };

            match selected {
                Some(None) => {
                    io.print(&format!("Exiting {}...", menu.title))?;
                    return Ok(None);
                }
                Some(action) => return Ok(action),
                None => io.print("Invalid choice. Please try again.")?,
            }
        }
    }

    async fn submenu(&mut self, io: &ProgramIo, menu: &Menu<Action>) -> Result<()> {
        while let Some(action) = self.choose(io, menu).await? {
            self.perform(io, action).await?;
        }
        Ok(())
    }

    async fn perform(&mut self, io: &ProgramIo, action: Action) -> Result<()> {
        match action {
            Action::AddVehicle => self.add_vehicle(io).await,
            Action::UpdateVehicle => self.update_vehicle(io).await,
            Action::RemoveVehicle => self.remove_vehicle(io).await,
            Action::ViewVehicles => self.view_vehicles(io),
            Action::AddCustomer => self.add_customer(io).await,
            Action::UpdateCustomer => self.update_customer(io).await,
            Action::RemoveCustomer => self.remove_customer(io).await,
            Action::ViewCustomers => self.view_customers(io),
            Action::ViewCustomerShipments => self.view_customer_shipments(io).await,
            Action::CreateShipment => self.create_shipment(io).await,
            Action::TrackShipment => self.track_shipment(io).await,
            Action::ViewShipments => self.view_shipments(io),
            Action::MarkDelivery => self.mark_delivery(io).await,
            Action::ViewDeliveryStatus => self.view_delivery_status(io).await,
        }
    }

    fn show_vehicle(io: &ProgramIo, id: &str, vehicle: &Vehicle) -> Result<()> {
        io.print(&format!("Vehicle ID: {}", id))?;
        io.print(&format!("Type: {}", vehicle.kind))?;
        io.print(&format!("Capacity: {}", vehicle.capacity))?;
        io.print(&format!("Status: {}", vehicle.status))
    }

    fn show_customer(io: &ProgramIo, id: &str, customer: &Customer) -> Result<()> {
        io.print(&format!("Customer ID: {}", id))?;
        io.print(&format!("Name: {}", customer.name))?;
        io.print(&format!("Contact: {}", customer.contact))?;
        io.print(&format!("Address: {}", customer.address))
    }

    /// Name of the shipment's customer; removed customers show as "Unknown"
    fn customer_name(&self, shipment: &Shipment) -> &str {
        self.customers
            .find(&shipment.customer_id)
            .map(|c| c.name.as_str())
            .unwrap_or("Unknown")
    }

    fn show_shipment(&self, io: &ProgramIo, id: &str, shipment: &Shipment) -> Result<()> {
        let vehicle = shipment
            .vehicle_id
            .as_deref()
            .and_then(|v| self.vehicles.find(v))
            .map(|v| v.kind.as_str())
            .unwrap_or("Not assigned");

        io.print(&format!("Shipment ID: {}", id))?;
        io.print(&format!("Customer: {}", self.customer_name(shipment)))?;
        io.print(&format!("Origin: {}", shipment.origin))?;
        io.print(&format!("Destination: {}", shipment.destination))?;
        io.print(&format!("Contents: {}", shipment.contents))?;
        io.print(&format!("Weight: {}", shipment.weight))?;
        io.print(&format!("Vehicle: {}", vehicle))?;
        io.print(&format!("Status: {}", shipment.status))
    }

    async fn add_vehicle(&mut self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== Add a New Vehicle ===")?;
        let kind = io.input("Enter vehicle type: ").await?;
        let capacity = io.input("Enter vehicle capacity: ").await?;
        let status =
            input_or(io, "Enter vehicle status (or press Enter for 'Available'): ", "Available")
                .await?;

        let id = self.vehicles.add(Vehicle {
            kind,
            capacity,
            status,
        });
        io.print(&format!("Vehicle added successfully with ID: {}", id))
    }

    async fn update_vehicle(&mut self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== Update Vehicle Information ===")?;
        let id = io.input("Enter vehicle ID to update: ").await?;
        let Some(current) = self.vehicles.find(&id).cloned() else {
            return io.print(&format!("No vehicle found with ID: {}", id));
        };

        io.print("Current vehicle information:")?;
        Self::show_vehicle(io, &id, &current)?;

        let kind = input_or(
            io,
            &format!("Enter new type (or press Enter to keep '{}'): ", current.kind),
            &current.kind,
        )
        .await?;
        let capacity = input_or(
            io,
            &format!("Enter new capacity (or press Enter to keep '{}'): ", current.capacity),
            &current.capacity,
        )
        .await?;
        let status = input_or(
            io,
            &format!("Enter new status (or press Enter to keep '{}'): ", current.status),
            &current.status,
        )
        .await?;

        if let Some(vehicle) = self.vehicles.find_mut(&id) {
            *vehicle = Vehicle {
                kind,
                capacity,
                status,
            };
        }
        io.print("Vehicle information updated successfully.")
    }

    async fn remove_vehicle(&mut self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== Remove a Vehicle ===")?;
        let id = io.input("Enter vehicle ID to remove: ").await?;
        let Some(vehicle) = self.vehicles.find(&id).cloned() else {
            return io.print(&format!("No vehicle found with ID: {}", id));
        };

        io.print("Vehicle to be removed:")?;
        Self::show_vehicle(io, &id, &vehicle)?;

        let confirm = io
            .input("Are you sure you want to remove this vehicle? (y/n): ")
            .await?;
        if confirm.eq_ignore_ascii_case("y") {
            self.vehicles.remove(&id);
            io.print("Vehicle removed successfully.")
        } else {
            io.print("Removal cancelled.")
        }
    }

    fn view_vehicles(&self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== All Vehicles ===")?;
        if self.vehicles.is_empty() {
            return io.print("No vehicles in the fleet.");
        }
        for (id, vehicle) in self.vehicles.all() {
            Self::show_vehicle(io, id, vehicle)?;
            rule(io)?;
        }
        Ok(())
    }

    async fn add_customer(&mut self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== Add a New Customer ===")?;
        let name = io.input("Enter customer name: ").await?;
        let contact = io.input("Enter customer contact information: ").await?;
        let address = io.input("Enter customer address: ").await?;

        let id = self.customers.add(Customer {
            name,
            contact,
            address,
            shipment_ids: Vec::new(),
        });
        io.print(&format!("Customer added successfully with ID: {}", id))
    }

    async fn update_customer(&mut self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== Update Customer Information ===")?;
        let id = io.input("Enter customer ID to update: ").await?;
        let Some(current) = self.customers.find(&id).cloned() else {
            return io.print(&format!("No customer found with ID: {}", id));
        };

        io.print("Current customer information:")?;
        Self::show_customer(io, &id, &current)?;

        let name = input_or(
            io,
            &format!("Enter new name (or press Enter to keep '{}'): ", current.name),
            &current.name,
        )
        .await?;
        let contact = input_or(
            io,
            &format!("Enter new contact (or press Enter to keep '{}'): ", current.contact),
            &current.contact,
        )
        .await?;
        let address = input_or(
            io,
            &format!("Enter new address (or press Enter to keep '{}'): ", current.address),
            &current.address,
        )
        .await?;

        if let Some(customer) = self.customers.find_mut(&id) {
            customer.name = name;
            customer.contact = contact;
            customer.address = address;
        }
        io.print("Customer information updated successfully.")
    }

    async fn remove_customer(&mut self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== Remove a Customer ===")?;
        let id = io.input("Enter customer ID to remove: ").await?;
        let Some(customer) = self.customers.find(&id).cloned() else {
            return io.print(&format!("No customer found with ID: {}", id));
        };

        io.print("Customer to be removed:")?;
        Self::show_customer(io, &id, &customer)?;
        if !customer.shipment_ids.is_empty() {
            io.print(&format!(
                "Warning: This customer has {} shipments.",
                customer.shipment_ids.len()
            ))?;
            io.print("Removing this customer will affect these shipments.")?;
        }

        let confirm = io
            .input("Are you sure you want to remove this customer? (y/n): ")
            .await?;
        if confirm.eq_ignore_ascii_case("y") {
            self.customers.remove(&id);
            io.print("Customer removed successfully.")
        } else {
            io.print("Removal cancelled.")
        }
    }

    fn view_customers(&self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== All Customers ===")?;
        if self.customers.is_empty() {
            return io.print("No customers in the database.");
        }
        for (id, customer) in self.customers.all() {
            Self::show_customer(io, id, customer)?;
            io.print(&format!("Number of shipments: {}", customer.shipment_ids.len()))?;
            rule(io)?;
        }
        Ok(())
    }

    async fn view_customer_shipments(&self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== View Customer's Shipments ===")?;
        let id = io.input("Enter customer ID: ").await?;
        let Some(customer) = self.customers.find(&id) else {
            return io.print(&format!("No customer found with ID: {}", id));
        };

        io.print(&format!("Shipments for customer: {} (ID: {})", customer.name, id))?;
        if customer.shipment_ids.is_empty() {
            return io.print("No shipments found for this customer.");
        }
        for shipment_id in &customer.shipment_ids {
            match self.shipments.find(shipment_id) {
                Some(shipment) => {
                    self.show_shipment(io, shipment_id, shipment)?;
                    rule(io)?;
                }
                None => io.print(&format!("Warning: Shipment ID {} not found.", shipment_id))?,
            }
        }
        Ok(())
    }

    async fn create_shipment(&mut self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== Create a New Shipment ===")?;
        let customer_id = io.input("Enter customer ID: ").await?;
        if self.customers.find(&customer_id).is_none() {
            return io.print(&format!("No customer found with ID: {}", customer_id));
        }

        let origin = io.input("Enter origin: ").await?;
        let destination = io.input("Enter destination: ").await?;
        let contents = io.input("Enter contents: ").await?;
        let weight = io.input("Enter weight: ").await?;

        let vehicle = io
            .input("Enter vehicle ID (or press Enter to assign later): ")
            .await?;
        let vehicle_id = if vehicle.is_empty() {
            None
        } else if self.vehicles.find(&vehicle).is_some() {
            Some(vehicle)
        } else {
            io.print(&format!("Warning: No vehicle found with ID: {}", vehicle))?;
            None
        };

        let id = self.shipments.add(Shipment {
            customer_id: customer_id.clone(),
            origin,
            destination,
            contents,
            weight,
            vehicle_id,
            status: "Pending".to_string(),
            delivery_id: None,
        });
        if let Some(customer) = self.customers.find_mut(&customer_id) {
            customer.shipment_ids.push(id.clone());
        }
        io.print(&format!("Shipment created successfully with ID: {}", id))
    }

    async fn track_shipment(&self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== Track a Shipment ===")?;
        let id = io.input("Enter shipment ID: ").await?;
        let Some(shipment) = self.shipments.find(&id) else {
            return io.print(&format!("No shipment found with ID: {}", id));
        };

        io.print("Shipment Information:")?;
        self.show_shipment(io, &id, shipment)
    }

    fn view_shipments(&self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== All Shipments ===")?;
        if self.shipments.is_empty() {
            return io.print("No shipments in the database.");
        }
        for (id, shipment) in self.shipments.all() {
            self.show_shipment(io, id, shipment)?;
            rule(io)?;
        }
        Ok(())
    }

    async fn mark_delivery(&mut self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== Mark Shipment Delivery ===")?;
        let shipment_id = io.input("Enter shipment ID: ").await?;
        let Some(shipment) = self.shipments.find(&shipment_id) else {
            return io.print(&format!("No shipment found with ID: {}", shipment_id));
        };

        let existing = shipment
            .delivery_id
            .clone()
            .and_then(|id| self.deliveries.find(&id).cloned().map(|d| (id, d)));

        if let Some((delivery_id, delivery)) = existing {
            io.print(&format!(
                "This shipment already has a delivery record (ID: {}, Status: {})",
                delivery_id, delivery.status
            ))?;
            let update = io
                .input("Do you want to update the delivery status? (y/n): ")
                .await?;
            if !update.eq_ignore_ascii_case("y") {
                return Ok(());
            }

            let status = io.input("Enter new delivery status: ").await?;
            let date = io.input("Enter delivery date: ").await?;
            if let Some(record) = self.deliveries.find_mut(&delivery_id) {
                record.status = status;
                record.date = date;
            }
            return io.print("Delivery status updated successfully.");
        }

        let date = io.input("Enter delivery date: ").await?;
        let status =
            input_or(io, "Enter delivery status (or press Enter for 'Delivered'): ", "Delivered")
                .await?;

        let delivery_id = self.deliveries.add(Delivery {
            shipment_id: shipment_id.clone(),
            date,
            status: status.clone(),
        });
        if let Some(shipment) = self.shipments.find_mut(&shipment_id) {
            shipment.delivery_id = Some(delivery_id.clone());
            shipment.status = status;
        }
        io.print(&format!("Delivery marked successfully with ID: {}", delivery_id))
    }

    async fn view_delivery_status(&self, io: &ProgramIo) -> Result<()> {
        io.print("\n=== View Delivery Status ===")?;
        let id = io.input("Enter shipment ID: ").await?;
        let Some(shipment) = self.shipments.find(&id) else {
            return io.print(&format!("No shipment found with ID: {}", id));
        };

        io.print(&format!("Shipment ID: {}", id))?;
        io.print(&format!("Customer: {}", self.customer_name(shipment)))?;
        io.print(&format!("Status: {}", shipment.status))?;

        let Some(delivery_id) = shipment.delivery_id.as_deref() else {
            return io.print("No delivery information available for this shipment.");
        };
        match self.deliveries.find(delivery_id) {
            Some(delivery) => {
                io.print("\nDelivery Information:")?;
                io.print(&format!("Delivery ID: {}", delivery_id))?;
                io.print(&format!("Shipment ID: {}", delivery.shipment_id))?;
                io.print(&format!("Delivery Date: {}", delivery.date))?;
                io.print(&format!("Delivery Status: {}", delivery.status))
            }
            None => io.print("Delivery record not found, but shipment references a delivery."),
        }
    }
}

#[async_trait]
impl Program for Logistics {
    fn title(&self) -> &str {
        "Logistics Management System"
    }

    async fn load(&mut self) -> Result<()> {
        if self.vehicles.is_empty() && self.customers.is_empty() && self.shipments.is_empty() {
            self.seed();
        }
        Ok(())
    }

    async fn run(&mut self, io: &ProgramIo) -> Result<()> {
        while let Some(area) = self.choose(io, &MAIN_MENU).await? {
            let menu = match area {
                Area::Fleet => &FLEET_MENU,
                Area::Customers => &CUSTOMER_MENU,
                Area::Shipments => &SHIPMENT_MENU,
                Area::Deliveries => &DELIVERY_MENU,
            };
            self.submenu(io, menu).await?;
        }
        io.print("Thank you for using the Logistics Management System. Goodbye!")
    }
}
